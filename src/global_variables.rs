// Signal timing
pub const MIN_GREEN_TIME: u32 = 10;
pub const MAX_PASS: u32 = 3;

// Arrivals (per wall-clock second, divided by the speed multiplier)
pub const ARRIVAL_PROBABILITY: f64 = 0.2;
pub const BURST_START_PROBABILITY: f64 = 0.008;
// Bursts are tick-rate, not scaled by the speed multiplier
pub const BURST_ARRIVAL_PROBABILITY: f64 = 0.8;
pub const BURST_MIN_TICKS: u32 = 10;
pub const BURST_MAX_TICKS: u32 = 20;
pub const RECENT_WINDOW: usize = 5;

// Emergency vehicles
pub const EMERGENCY_SPAWN_PROBABILITY: f64 = 0.03;
pub const EMERGENCY_INITIAL_TICKS: i32 = 5;
pub const EMERGENCY_FAILSAFE_TICKS: i32 = -55;
pub const CRASH_PROBABILITY: f64 = 0.3;

// Agent
pub const PRESSURE_THRESHOLD: i32 = 3;
pub const ALPHA: f64 = 0.1;
pub const GAMMA: f64 = 0.9;
pub const EPSILON: f64 = 0.1;

// Default reward weights
pub const CAR_PASSED_REWARD: f64 = 1.0;
pub const CAR_WAITING_REWARD: f64 = -0.1;
pub const PHASE_SWITCH_REWARD: f64 = -2.0;
pub const AMBULANCE_PASSED_REWARD: f64 = 5.0;
pub const AMBULANCE_WAITING_REWARD: f64 = -10.0;
pub const AMBULANCE_CRASH_REWARD: f64 = -100.0;

// Observability
pub const EXTEND_LOG_INTERVAL_SECS: f64 = 5.0;
pub const EVENT_LOG_CAPACITY: usize = 500;

// Persisted store keys
pub const STORE_KEY_Q_TABLE: &str = "qTable";
pub const STORE_KEY_SESSION_TIME: &str = "totalSessionTime";
pub const DEFAULT_STORE_PATH: &str = "intersection_rl_store.json";
