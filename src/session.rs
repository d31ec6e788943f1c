use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::{
    ast::Statement,
    database::{Database, Outcome},
    error::{Error, Result},
    parser::parse_segment,
    render::{DEFAULT_WIDTH, render_snapshot},
    segmenter::segment,
    tokenizer::tokenize,
};

/// `load` files may load other files, up to this depth.
const MAX_LOAD_DEPTH: usize = 16;

/// Settings a session runs with.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Field width of rendered tables.
    pub width: usize,
    /// File the catalog snapshot is written to when the session ends.
    pub backup: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            backup: None,
        }
    }
}

/// A database plus the statements that only make sense around it:
/// `load`, `save` and `exit`.
///
/// # Example
/// ```
/// use oxyrel::{Outcome, Session};
///
/// let mut session = Session::default();
/// let results = session.run(
///     "create person ( id int primary key ( id ) ) \
///      insert into person ( id ) values ( 1 ) \
///      insert into person ( id ) values ( 1 ) \
///      exit",
/// );
///
/// assert!(results[1].is_ok());
/// assert!(results[2].is_err());
/// assert!(matches!(results[3], Ok(Outcome::Exit)));
/// ```
#[derive(Debug, Default)]
pub struct Session {
    db: Database,
    config: SessionConfig,
    load_depth: usize,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            db: Database::new(),
            config,
            load_depth: 0,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Runs every statement of `input` and returns one result per statement.
    ///
    /// A failing statement is reported and the batch goes on. A segmentation
    /// error ends the batch and comes last; so does `exit`.
    pub fn run(&mut self, input: &str) -> Vec<Result<Outcome>> {
        let tokens = match tokenize(input) {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "input rejected");
                return vec![Err(err)];
            }
        };

        let mut results = vec![];
        for segment in segment(&tokens) {
            let result = segment
                .and_then(|segment| parse_segment(&segment))
                .and_then(|statement| self.execute(statement));
            match &result {
                Ok(outcome) => debug!(?outcome, "statement done"),
                Err(err) => warn!(kind = err.kind(), error = %err, "statement rejected"),
            }
            let exit = matches!(result, Ok(Outcome::Exit));
            results.push(result);
            if exit {
                break;
            }
        }
        results
    }

    fn execute(&mut self, statement: Statement) -> Result<Outcome> {
        match statement {
            Statement::Load(path) => self.load(path),
            Statement::Save(path) => self.save(path),
            Statement::Exit => Ok(Outcome::Exit),
            statement => self.db.execute_statement(statement),
        }
    }

    /// Runs a command file. Its failing statements are skipped and counted.
    pub fn load(&mut self, path: PathBuf) -> Result<Outcome> {
        if self.load_depth >= MAX_LOAD_DEPTH {
            return Err(Error::parse(format!(
                "load of {} nested more than {MAX_LOAD_DEPTH} levels deep",
                path.display()
            )));
        }
        let script = fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        self.load_depth += 1;
        let results = self.run(&script);
        self.load_depth -= 1;

        let failed = results.iter().filter(|r| r.is_err()).count();
        let succeeded = results.len() - failed;
        info!(path = %path.display(), succeeded, failed, "loaded script");
        Ok(Outcome::Loaded {
            path,
            succeeded,
            failed,
        })
    }

    /// Writes the catalog snapshot to `path`.
    pub fn save(&self, path: PathBuf) -> Result<Outcome> {
        write_snapshot(&path, &self.snapshot())?;
        info!(path = %path.display(), "saved snapshot");
        Ok(Outcome::Saved(path))
    }

    /// The rendered catalog, at the configured width.
    pub fn snapshot(&self) -> String {
        render_snapshot(&self.db, self.config.width)
    }

    /// Ends the session: returns the snapshot and writes it to the backup
    /// file, if one is configured. A failing backup is only logged.
    pub fn finish(&self) -> String {
        let snapshot = self.snapshot();
        if let Some(path) = &self.config.backup {
            match write_snapshot(path, &snapshot) {
                Ok(()) => info!(path = %path.display(), "wrote backup"),
                Err(err) => error!(error = %err, "backup failed"),
            }
        }
        snapshot
    }
}

fn write_snapshot(path: &Path, snapshot: &str) -> Result<()> {
    fs::write(path, snapshot).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
