use std::fmt;
use std::path::PathBuf;

/// Compiler families whose Qt binary builds are mutually incompatible on
/// Windows. Linking MSVC-built Qt against MinGW objects (or vice versa)
/// fails late with opaque linker errors, so the flavor is worth detecting
/// up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainFlavor {
    Msvc,
    Mingw,
}

impl ToolchainFlavor {
    /// Lowercase form, as it appears in Qt install path segments.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainFlavor::Msvc => "msvc",
            ToolchainFlavor::Mingw => "mingw",
        }
    }

    /// Display form for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            ToolchainFlavor::Msvc => "MSVC",
            ToolchainFlavor::Mingw => "MinGW",
        }
    }
}

impl fmt::Display for ToolchainFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the best-effort compiler probe behind the `verify` report.
///
/// `description` is absent when no usable compiler was found; `hint` carries
/// the remediation (or a caveat when a toolchain was detected but is not
/// fully usable, e.g. found via vswhere with cl.exe off PATH).
#[derive(Debug, Default)]
pub struct CompilerDetection {
    pub description: Option<String>,
    pub hint: Option<String>,
    pub library_dirs: Vec<PathBuf>,
}
