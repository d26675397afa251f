pub mod config;
pub mod foam;
pub mod geom;
pub mod kernel;
pub mod names;
pub mod report;

pub use config::{Config, ConfigError};
pub use geom::{BBox3, Vec3};
pub use kernel::{CadKernel, Dim, KernelError, Tag};
pub use names::validate_name;
