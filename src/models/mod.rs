mod workflow_run;

pub use workflow_run::*;
