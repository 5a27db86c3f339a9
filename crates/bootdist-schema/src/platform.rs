//! Target platforms: OS family, architecture and the tag naming version directories

/// Operating system family a distribution is packaged for.
///
/// Decides executable suffixes, whether a GUI subsystem base is requested from
/// the freezer, and which loader mode is viable by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux and other ELF-based unixes.
    Linux,
    /// macOS.
    Macos,
    /// Windows.
    Windows,
}

/// CPU architecture half of a platform tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// `x86_64` / amd64.
    X86_64,
    /// ARM64 (`aarch64`).
    Aarch64,
    /// 32-bit x86.
    X86,
}

/// Target platform of a packaging run, e.g. `linux-x86_64`.
///
/// # Example
///
/// ```
/// use bootdist_schema::Platform;
///
/// let current = Platform::current();
/// println!("Packaging for: {current}");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Get the platform this binary was compiled for.
    pub fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::Macos
        } else {
            Os::Linux
        };
        let arch = if cfg!(target_arch = "aarch64") {
            Arch::Aarch64
        } else if cfg!(target_arch = "x86") {
            Arch::X86
        } else {
            Arch::X86_64
        };
        Self { os, arch }
    }

    /// Whether this is a Windows target.
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Suffix appended to executable file names (`.exe` on Windows).
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }

    /// Freezer base for GUI-only executables, if the platform has one.
    pub fn gui_base(&self) -> Option<&'static str> {
        self.is_windows().then_some("Win32GUI")
    }

    /// Platform tag used in version directory names.
    pub fn tag(&self) -> String {
        format!("{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

impl Os {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macosx",
            Self::Windows => "win",
        }
    }
}

impl Arch {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
            Self::X86 => "i686",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let (os, arch) = lower
            .split_once('-')
            .ok_or_else(|| format!("Unknown platform: {s} (expected <os>-<arch>)"))?;
        let os = match os {
            "linux" => Os::Linux,
            "macos" | "macosx" | "darwin" => Os::Macos,
            "win" | "windows" | "win32" => Os::Windows,
            _ => return Err(format!("Unknown operating system: {os}")),
        };
        let arch = match arch {
            "x86_64" | "amd64" => Arch::X86_64,
            "aarch64" | "arm64" => Arch::Aarch64,
            "i686" | "x86" | "i386" => Arch::X86,
            _ => return Err(format!("Unknown architecture: {arch}")),
        };
        Ok(Self { os, arch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        let p: Platform = "windows-amd64".parse().unwrap();
        assert_eq!(p.os, Os::Windows);
        assert_eq!(p.arch, Arch::X86_64);
        assert_eq!(p.tag(), "win-x86_64");
    }

    #[test]
    fn rejects_missing_arch() {
        assert!("linux".parse::<Platform>().is_err());
        assert!("plan9-x86_64".parse::<Platform>().is_err());
    }

    #[test]
    fn exe_suffix_only_on_windows() {
        let win: Platform = "win-x86_64".parse().unwrap();
        let linux: Platform = "linux-aarch64".parse().unwrap();
        assert_eq!(win.exe_suffix(), ".exe");
        assert_eq!(linux.exe_suffix(), "");
        assert_eq!(win.gui_base(), Some("Win32GUI"));
        assert_eq!(linux.gui_base(), None);
    }
}
