//! Operating modes, probe candidates and concrete subprocess invocations.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

/// Where the engine's control endpoint lives and which client reaches it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OperatingMode {
    /// System engine, system client, default connection.
    HostEngineHostClient,
    /// System (or otherwise already running) engine on the local TCP port,
    /// reached with the system client.
    HostEngineViaPort,
    /// Privately provisioned daemon on the local TCP port, reached with the
    /// privately provisioned client.
    PrivateEngineViaPort,
    /// No endpoint could be reached.
    #[default]
    NoEngine,
}

impl OperatingMode {
    /// Returns `true` for every mode other than [`Self::NoEngine`].
    #[must_use]
    pub const fn is_reachable(self) -> bool {
        !matches!(self, Self::NoEngine)
    }

    /// Stable name used in progress messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HostEngineHostClient => "HostEngineHostClient",
            Self::HostEngineViaPort => "HostEngineViaPort",
            Self::PrivateEngineViaPort => "PrivateEngineViaPort",
            Self::NoEngine => "NoEngine",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a client binary connects to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    /// The client's default local socket; no connection argument.
    Default,
    /// A TCP port on the local host, passed as `-H :<port>`.
    LocalPort(u16),
}

impl Connection {
    /// Connection arguments placed before the engine command.
    #[must_use]
    pub fn client_args(self) -> Vec<String> {
        match self {
            Self::Default => Vec::new(),
            Self::LocalPort(port) => vec![String::from("-H"), format!(":{port}")],
        }
    }
}

/// Arguments binding a daemon to every interface on `port`.
#[must_use]
pub fn daemon_bind_args(port: u16) -> Vec<String> {
    vec![String::from("-H"), format!("0.0.0.0:{port}")]
}

/// A client binary paired with a connection, tried during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    client: Utf8PathBuf,
    connection: Connection,
}

impl Candidate {
    /// Create a candidate for `client` using `connection`.
    pub fn new(client: impl Into<Utf8PathBuf>, connection: Connection) -> Self {
        Self {
            client: client.into(),
            connection,
        }
    }

    /// The client binary.
    #[must_use]
    pub fn client(&self) -> &Utf8Path {
        &self.client
    }

    /// The connection the client uses.
    #[must_use]
    pub const fn connection(&self) -> Connection {
        self.connection
    }

    /// Build an invocation running `command` through this candidate.
    ///
    /// Connection arguments always precede the command arguments.
    pub fn invocation<I, S>(&self, command: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = self.connection.client_args();
        args.extend(command.into_iter().map(Into::into));
        Invocation::new(self.client.clone(), args)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.connection {
            Connection::Default => write!(f, "{} (default connection)", self.client),
            Connection::LocalPort(port) => write!(f, "{} -H :{port}", self.client),
        }
    }
}

/// A program and its argument vector, ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: Utf8PathBuf,
    args: Vec<String>,
}

impl Invocation {
    /// Create an invocation of `program` with `args`.
    pub fn new(program: impl Into<Utf8PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The program to launch.
    #[must_use]
    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    /// The arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
