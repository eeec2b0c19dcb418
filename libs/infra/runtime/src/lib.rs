// [libs/infra/runtime/src/lib.rs]
pub mod adapter;
pub mod docker;
pub mod errors;
pub mod mock;
pub mod spec;

pub use adapter::{ContainerRuntime, InteractiveShell, LogEventStream, ProgressSink, PtyControl};
pub use docker::DockerRuntime;
pub use errors::RuntimeError;
pub use mock::MockRuntime;
pub use spec::{
    BatchExecOutcome, ContainerProbe, ContainerSpec, LogEvent, ProbeStatus,
    CPU_PERIOD_MICROSECONDS, LABEL_PLATFORM, LABEL_SANDBOX_ID, LABEL_USER_ID,
    RETAINED_CAPABILITIES,
};
