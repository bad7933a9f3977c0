//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - invalid `--var` or variable value
pub const VALIDATION_ERROR: i32 = 2;

/// Template error - rendering or manifest identification failed
pub const TEMPLATE_ERROR: i32 = 3;

/// Source error - missing, empty or unreadable manifest folder
pub const SOURCE_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Deploy error - a target operation (apply, list, delete) failed
pub const DEPLOY_ERROR: i32 = 6;

/// Cluster error - kubeconfig, API access or provisioning failed
pub const CLUSTER_ERROR: i32 = 7;
