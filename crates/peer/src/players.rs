use lockstep::{DEFAULT_PORT, MAX_PLAYERS};

/// Entries this short are a local port rather than a `host:port` address.
const LOCAL_ENTRY_MAX_LEN: usize = 5;

const DEFAULT_REMOTE: &str = "127.0.0.1:6700";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlayerListError {
    #[error("player amount must be between 1 and {max}, got {count}")]
    PlayerCount { count: usize, max: usize },
    #[error("expected {expected} player entries, got {actual}")]
    MissingPlayers { expected: usize, actual: usize },
    #[error("invalid local port {0:?}")]
    InvalidPort(String),
    #[error("no local player in the list")]
    NoLocalPlayer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEntry {
    Local,
    Remote(String),
}

/// Who plays in which slot, from the positional process arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerList {
    pub entries: Vec<PlayerEntry>,
    /// The last local entry.
    pub local_index: usize,
    pub local_port: u16,
}

impl Default for PlayerList {
    fn default() -> Self {
        Self {
            entries: vec![
                PlayerEntry::Local,
                PlayerEntry::Remote(DEFAULT_REMOTE.to_string()),
            ],
            local_index: 0,
            local_port: DEFAULT_PORT,
        }
    }
}

impl PlayerList {
    /// Without a player count the defaults apply. Entries past the count are
    /// ignored.
    pub fn parse(num_players: Option<usize>, args: &[String]) -> Result<Self, PlayerListError> {
        let Some(num_players) = num_players else {
            return Ok(Self::default());
        };
        if !(1..=MAX_PLAYERS).contains(&num_players) {
            return Err(PlayerListError::PlayerCount {
                count: num_players,
                max: MAX_PLAYERS,
            });
        }
        if args.len() < num_players {
            return Err(PlayerListError::MissingPlayers {
                expected: num_players,
                actual: args.len(),
            });
        }

        let mut entries = Vec::with_capacity(num_players);
        let mut local = None;
        for (index, arg) in args.iter().take(num_players).enumerate() {
            if arg.len() <= LOCAL_ENTRY_MAX_LEN {
                let port = arg
                    .parse::<u16>()
                    .map_err(|_| PlayerListError::InvalidPort(arg.clone()))?;
                local = Some((index, port));
                entries.push(PlayerEntry::Local);
            } else {
                entries.push(PlayerEntry::Remote(arg.clone()));
            }
        }

        let (local_index, local_port) = local.ok_or(PlayerListError::NoLocalPlayer)?;
        Ok(Self {
            entries,
            local_index,
            local_port,
        })
    }

    pub fn num_players(&self) -> usize {
        self.entries.len()
    }

    /// The peer in slot 0 hosts; everyone else joins it.
    pub fn is_host(&self) -> bool {
        matches!(self.entries.first(), Some(PlayerEntry::Local))
    }

    pub fn host_address(&self) -> Option<&str> {
        match self.entries.first() {
            Some(PlayerEntry::Remote(addr)) => Some(addr),
            _ => None,
        }
    }
}
