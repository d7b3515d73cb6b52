pub mod q_learning;
pub mod reward_policy;
pub mod traffic_light_controller;
