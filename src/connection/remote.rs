//! SSH/SFTP backend for [`Connection`](super::Connection).
//!
//! Authentication order: agent, then the usual key files, then an
//! interactive password — the latter only when stdin is a terminal, so
//! unattended runs fail fast instead of hanging on a prompt.

use std::io::{self, IsTerminal, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};

use ssh2::{FileStat, OpenFlags, OpenType, Session, Sftp};

use crate::errors::{BlueError, errno_detail};

use super::{ExecOutput, FileStream};

const SSH_PORT: u16 = 22;

pub struct RemoteConnection {
    session: Session,
    sftp: Sftp,
}

impl RemoteConnection {
    /// Connect and authenticate to `address` (`host` or `user@host`).
    pub fn connect(address: &str) -> Result<Self, BlueError> {
        let (user, host) = match address.split_once('@') {
            Some((user, host)) => (user.to_owned(), host.to_owned()),
            None => (
                std::env::var("USER").unwrap_or_else(|_| "root".to_owned()),
                address.to_owned(),
            ),
        };

        let fail = |detail: String| BlueError::Connection {
            host: host.clone(),
            detail,
        };

        // getaddrinfo failures render the classic resolver errno.
        let mut addrs = (host.as_str(), SSH_PORT)
            .to_socket_addrs()
            .map_err(|_| fail("[Errno -2] Name or service not known".to_owned()))?;
        let addr = addrs
            .next()
            .ok_or_else(|| fail("[Errno -2] Name or service not known".to_owned()))?;

        let stream = TcpStream::connect(addr).map_err(|err| fail(errno_detail(&err)))?;

        let mut session = Session::new().map_err(|err| fail(err.message().to_owned()))?;
        session.set_tcp_stream(stream);
        session
            .handshake()
            .map_err(|err| fail(err.message().to_owned()))?;

        authenticate(&session, &user, address).map_err(fail)?;

        let sftp = session
            .sftp()
            .map_err(|err| fail(err.message().to_owned()))?;

        Ok(Self { session, sftp })
    }

    pub fn open(&self, path: &Path, mode: &str) -> io::Result<Box<dyn FileStream>> {
        let flags = match mode {
            "rb" => OpenFlags::READ,
            "wb" => OpenFlags::WRITE | OpenFlags::TRUNCATE | OpenFlags::CREATE,
            _ => OpenFlags::WRITE | OpenFlags::APPEND | OpenFlags::CREATE,
        };
        let file = self
            .sftp
            .open_mode(path, flags, 0o644, OpenType::File)
            .map_err(to_io)?;
        Ok(Box::new(file))
    }

    pub fn run(&self, argv: &[&str]) -> io::Result<ExecOutput> {
        let mut channel = self.session.channel_session().map_err(to_io)?;
        channel.exec(&shell_join(argv)).map_err(to_io)?;

        let mut stdout = String::new();
        channel.read_to_string(&mut stdout)?;
        let mut stderr = String::new();
        channel.stderr().read_to_string(&mut stderr)?;

        channel.wait_close().map_err(to_io)?;
        let code = channel.exit_status().map_err(to_io)?;

        Ok(ExecOutput {
            stdout,
            stderr,
            code,
        })
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.sftp.stat(path).is_ok()
    }

    pub fn mkdir(&self, path: &Path) -> io::Result<()> {
        self.sftp.mkdir(path, 0o755).map_err(to_io)
    }

    pub fn listdir(&self, path: &Path) -> io::Result<Vec<String>> {
        let entries = self.sftp.readdir(path).map_err(to_io)?;
        Ok(entries
            .into_iter()
            .filter_map(|(entry, _stat)| {
                entry.file_name().map(|n| n.to_string_lossy().into_owned())
            })
            .collect())
    }

    pub fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        let stat = FileStat {
            size: None,
            uid: None,
            gid: None,
            perm: Some(mode),
            atime: None,
            mtime: None,
        };
        self.sftp.setstat(path, stat).map_err(to_io)
    }

    pub fn rename(&self, src: &Path, dst: &Path) -> io::Result<()> {
        self.sftp.rename(src, dst, None).map_err(to_io)
    }

    pub fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.sftp.unlink(path).map_err(to_io)
    }
}

fn authenticate(session: &Session, user: &str, address: &str) -> Result<(), String> {
    if session.userauth_agent(user).is_ok() && session.authenticated() {
        return Ok(());
    }

    let home = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/root".to_owned()));
    for name in ["id_ed25519", "id_rsa"] {
        let key = home.join(".ssh").join(name);
        if key.exists()
            && session
                .userauth_pubkey_file(user, None, &key, None)
                .is_ok()
            && session.authenticated()
        {
            return Ok(());
        }
    }

    if !io::stdin().is_terminal() {
        return Err("No terminal. Cannot get password.".to_owned());
    }
    let password = rpassword::prompt_password(format!("{address}'s password: "))
        .map_err(|_| "No input. Cannot get password.".to_owned())?;
    session
        .userauth_password(user, &password)
        .map_err(|_| "Authentication failed.".to_owned())?;

    if session.authenticated() {
        Ok(())
    } else {
        Err("Authentication failed.".to_owned())
    }
}

fn to_io(err: ssh2::Error) -> io::Error {
    io::Error::other(err.message().to_owned())
}

fn shell_join(argv: &[&str]) -> String {
    argv.iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./=%:,@".contains(&b))
    {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
