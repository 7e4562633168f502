pub mod autopilot;
pub mod policy;
pub mod reports;
pub mod scenarios;
pub mod tester;

pub use policy::GameplayStrategy;
pub use scenarios::{get_scenario, list_scenarios, scenario_names};
pub use tester::*;
