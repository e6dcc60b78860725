//! Uniform file and exec interface over one host.
//!
//! A [`Connection`] is either the local machine or a lazily authenticated
//! SSH/SFTP channel to a single remote host.  The orchestrator only ever
//! talks through this capability surface, so snapshot bookkeeping works the
//! same whether the target root is local or remote.  Remote *sources* never
//! need a connection; rsync dials them itself.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

use crate::errors::BlueError;

#[cfg(feature = "remote")]
mod remote;

/// Binary stream over a local or SFTP file.
pub trait FileStream: io::Read + io::Write {}

impl<T: io::Read + io::Write> FileStream for T {}

impl fmt::Debug for dyn FileStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<file stream>")
    }
}

/// Captured result of an external command.
#[derive(Debug)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

pub enum Connection {
    Local,
    #[cfg(feature = "remote")]
    Remote(remote::RemoteConnection),
}

impl Connection {
    /// Connection for an endpoint address; `None` means the local machine.
    pub fn open_endpoint(address: Option<&str>) -> Result<Self, BlueError> {
        match address {
            None => Ok(Self::Local),
            #[cfg(feature = "remote")]
            Some(address) => Ok(Self::Remote(remote::RemoteConnection::connect(address)?)),
            #[cfg(not(feature = "remote"))]
            Some(address) => {
                let host = address.rsplit('@').next().unwrap_or(address);
                Err(BlueError::RemoteUnavailable(host.to_owned()))
            }
        }
    }

    /// Open `path` as a binary stream; `mode` is one of `rb`, `wb`, `ab`.
    pub fn open(&self, path: &Path, mode: &str) -> io::Result<Box<dyn FileStream>> {
        if !matches!(mode, "rb" | "wb" | "ab") {
            return Err(io::Error::other(BlueError::BinaryMode(
                path.display().to_string(),
            )));
        }
        match self {
            Self::Local => {
                let file = match mode {
                    "rb" => fs::File::open(path)?,
                    "wb" => fs::File::create(path)?,
                    _ => fs::OpenOptions::new().create(true).append(true).open(path)?,
                };
                Ok(Box::new(file))
            }
            #[cfg(feature = "remote")]
            Self::Remote(remote) => remote.open(path, mode),
        }
    }

    /// Run `argv` on the connection's host and capture its output.
    pub fn run(&self, argv: &[&str]) -> io::Result<ExecOutput> {
        match self {
            Self::Local => {
                let output = Command::new(argv[0]).args(&argv[1..]).output()?;
                Ok(ExecOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    code: output.status.code().unwrap_or(-1),
                })
            }
            #[cfg(feature = "remote")]
            Self::Remote(remote) => remote.run(argv),
        }
    }

    pub fn exists(&self, path: &Path) -> bool {
        match self {
            Self::Local => path.exists(),
            #[cfg(feature = "remote")]
            Self::Remote(remote) => remote.exists(path),
        }
    }

    pub fn mkdir(&self, path: &Path) -> io::Result<()> {
        match self {
            Self::Local => fs::create_dir(path),
            #[cfg(feature = "remote")]
            Self::Remote(remote) => remote.mkdir(path),
        }
    }

    /// Immediate child names of `path`, in directory order.
    pub fn listdir(&self, path: &Path) -> io::Result<Vec<String>> {
        match self {
            Self::Local => {
                let mut names = Vec::new();
                for entry in fs::read_dir(path)? {
                    names.push(entry?.file_name().to_string_lossy().into_owned());
                }
                Ok(names)
            }
            #[cfg(feature = "remote")]
            Self::Remote(remote) => remote.listdir(path),
        }
    }

    pub fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        match self {
            Self::Local => {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(path, fs::Permissions::from_mode(mode))
            }
            #[cfg(feature = "remote")]
            Self::Remote(remote) => remote.chmod(path, mode),
        }
    }

    pub fn rename(&self, src: &Path, dst: &Path) -> io::Result<()> {
        match self {
            Self::Local => fs::rename(src, dst),
            #[cfg(feature = "remote")]
            Self::Remote(remote) => remote.rename(src, dst),
        }
    }

    pub fn remove_file(&self, path: &Path) -> io::Result<()> {
        match self {
            Self::Local => fs::remove_file(path),
            #[cfg(feature = "remote")]
            Self::Remote(remote) => remote.remove_file(path),
        }
    }

    pub fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        match self {
            Self::Local => fs::remove_dir_all(path),
            #[cfg(feature = "remote")]
            Self::Remote(remote) => {
                let out = remote.run(&["rm", "-rf", &path.to_string_lossy()])?;
                if out.success() {
                    Ok(())
                } else {
                    Err(io::Error::other(out.stderr.trim().to_owned()))
                }
            }
        }
    }
}
