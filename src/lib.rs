//! # qdev - CMake/Qt development workflow helper
//!
//! qdev wraps the configure/build/test/run cycle of a C++/Qt 6 project:
//! it detects a CMake generator, the active compiler flavor, and the Qt
//! installation to use, then delegates the actual work to `cmake`, `ctest`,
//! and the bundled Qt download helper.
//!
//! ## Quick Start
//!
//! ```bash
//! # Configure and build with auto-detected everything
//! qdev build
//!
//! # Build and run a target
//! qdev run sample_cli -- --help
//! ```
//!
//! ## Module Organization
//!
//! - [`settings`] - Persisted per-user defaults (`settings.json`)
//! - [`toolchain`] - Generator and compiler detection
//! - [`qt`] - Qt prefix resolution and toolchain matching
//! - [`project`] - CMake configure/build/test and target discovery
//! - [`updates`] - Upstream release checks

/// Remediation hints for missing tools.
pub mod hints;

/// External command execution and PATH probing.
pub mod process;

/// CMake configure/build/test and target discovery.
pub mod project;

/// Qt prefix resolution, flavor detection, and toolchain matching.
pub mod qt;

/// Persisted per-user settings.
pub mod settings;

/// Generator and compiler detection.
pub mod toolchain;

/// Upstream release checks for vendored libraries.
pub mod updates;

/// The `verify` environment report.
pub mod verify;

/// Version tuple parsing and comparison.
pub mod version;
