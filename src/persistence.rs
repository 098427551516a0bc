//! Saving and loading a library through the three record streams.
//!
//! Loading is order-sensitive: members, then books, then open loans, since
//! loan records refer to members by id and to books by title. Only open
//! loans are written; closed history does not survive a restart.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    codec::{self, BookRecord, CodecError, LoanRecord, MemberRecord},
    config::{LendingConfig, ReplayMode},
    library::Library,
    member::MemberId,
    observers::EventLogger,
};

/// A stream that could not be written
#[derive(Debug, Error)]
#[error("failed to write {}: {source}", .path.display())]
pub struct PersistenceError {
    /// Path of the stream
    pub path: PathBuf,
    /// What went wrong
    #[source]
    pub source: CodecError,
}

/// Reads and writes a library at the paths named by a `LendingConfig`
#[derive(Debug, Clone)]
pub struct LibraryStore {
    /// Stream locations and replay mode
    config: LendingConfig,
}

impl LibraryStore {
    /// Create a store for the given configuration
    #[must_use]
    pub fn new(config: LendingConfig) -> Self {
        Self { config }
    }

    /// The store's configuration
    #[must_use]
    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    /// Load the library, never failing.
    ///
    /// A missing stream is an empty one. Unreadable streams and broken
    /// records are logged and skipped; whatever loaded cleanly is kept.
    #[must_use]
    pub fn load(&self) -> Library {
        let mut library = Library::new(&self.config.library_name);

        if let Some(reader) = open_stream(&self.config.members_path()) {
            load_members(&mut library, reader);
        }
        if let Some(reader) = open_stream(&self.config.books_path()) {
            load_books(&mut library, reader);
        }
        if let Some(reader) = open_stream(&self.config.loans_path()) {
            load_open_loans(&mut library, reader, self.config.replay);
        }
        info!("loaded {library}");

        // Observers are attached after the replay
        library.register_observer(Box::new(EventLogger));
        library
    }

    /// Save all three streams, never failing.
    ///
    /// Each stream is written independently; a failure is logged and the
    /// remaining streams are still attempted. Returns whether every stream
    /// was written. Writes are not atomic.
    pub fn save(&self, library: &Library) -> bool {
        let results = [
            save_stream(&self.config.members_path(), |w| write_members(library, w)),
            save_stream(&self.config.books_path(), |w| write_books(library, w)),
            save_stream(&self.config.loans_path(), |w| write_open_loans(library, w)),
        ];

        let mut all_saved = true;
        for result in results {
            if let Err(e) = result {
                warn!("{e}");
                all_saved = false;
            }
        }
        all_saved
    }

    /// Save all three streams, stopping at the first failure
    ///
    /// # Errors
    ///
    /// Returns a `PersistenceError` naming the stream that failed.
    pub fn try_save(&self, library: &Library) -> Result<(), PersistenceError> {
        save_stream(&self.config.members_path(), |w| write_members(library, w))?;
        save_stream(&self.config.books_path(), |w| write_books(library, w))?;
        save_stream(&self.config.loans_path(), |w| write_open_loans(library, w))
    }
}

/// Open a stream for reading; `None` when it is absent or unreadable
fn open_stream(path: &Path) -> Option<BufReader<File>> {
    match File::open(path) {
        Ok(file) => {
            debug!("reading {}", path.display());
            Some(BufReader::new(file))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} does not exist, starting empty", path.display());
            None
        }
        Err(e) => {
            warn!("cannot open {}: {e}", path.display());
            None
        }
    }
}

/// Create or truncate a stream file and fill it with `write`
fn save_stream(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<(), CodecError>,
) -> Result<(), PersistenceError> {
    let wrap = |source: CodecError| PersistenceError { path: path.to_path_buf(), source };

    let file = File::create(path).map_err(|e| wrap(e.into()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).map_err(wrap)?;
    writer.flush().map_err(|e| wrap(e.into()))?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Write every member, in registration order
///
/// # Errors
///
/// Returns the first `CodecError` hit.
pub fn write_members<W: Write>(library: &Library, writer: &mut W) -> Result<(), CodecError> {
    let records: Vec<MemberRecord> = library
        .members()
        .map(|member| MemberRecord::new(member.id().0, member.name(), member.member().role()))
        .collect();
    codec::encode_stream(writer, &records)
}

/// Write every book, in registration order
///
/// # Errors
///
/// Returns the first `CodecError` hit.
pub fn write_books<W: Write>(library: &Library, writer: &mut W) -> Result<(), CodecError> {
    let records: Vec<BookRecord> = library
        .books()
        .map(|view| {
            let book = view.book();
            BookRecord {
                title: book.title().to_string(),
                edition: book.edition(),
                publisher: book.publisher().to_string(),
                year: book.year(),
            }
        })
        .collect();
    codec::encode_stream(writer, &records)
}

/// Write the open loans, in creation order
///
/// # Errors
///
/// Returns the first `CodecError` hit.
pub fn write_open_loans<W: Write>(library: &Library, writer: &mut W) -> Result<(), CodecError> {
    let records: Vec<LoanRecord> = library
        .loans()
        .filter(|loan| loan.is_open())
        .map(|loan| LoanRecord {
            member_id: loan.member().id().0,
            title: loan.book().title().to_string(),
            checkout_date: loan.loan().checkout_date(),
        })
        .collect();
    codec::encode_stream(writer, &records)
}

/// Log why a stream stopped early, if it did
fn report_stop(stream: &str, stopped_by: Option<CodecError>) {
    if let Some(e) = stopped_by {
        warn!("{stream} stream stopped early: {e}");
    }
}

/// Register the members of a stream, returning how many were added.
/// Unknown tags and duplicate ids are skipped.
pub fn load_members<R: BufRead>(library: &mut Library, reader: R) -> usize {
    let decoded = codec::decode_stream::<MemberRecord, _>(reader);
    let mut added = 0_usize;
    for record in decoded.records {
        let Some(role) = record.role() else {
            warn!("skipping member {} with unknown tag '{}'", record.id, record.tag);
            continue;
        };
        match library.register_member(MemberId(record.id), record.name, role) {
            Ok(_) => added = added.saturating_add(1),
            Err(e) => warn!("skipping member record: {e}"),
        }
    }
    report_stop("members", decoded.stopped_by);
    added
}

/// Register the books of a stream, returning how many were added
pub fn load_books<R: BufRead>(library: &mut Library, reader: R) -> usize {
    let decoded = codec::decode_stream::<BookRecord, _>(reader);
    let added = decoded.records.len();
    for record in decoded.records {
        library.register_book(record.title, record.edition, record.publisher, record.year);
    }
    report_stop("books", decoded.stopped_by);
    added
}

/// Attach the open loans of a stream, returning how many were attached.
///
/// Members are matched by id and books by `Library::find_book_by_title`, so
/// with duplicate titles every loan lands on the first exemplar. In
/// `ReplayMode::Checkout` each record goes through the checkout rules at its
/// own date and a refused record is dropped.
pub fn load_open_loans<R: BufRead>(library: &mut Library, reader: R, replay: ReplayMode) -> usize {
    let decoded = codec::decode_stream::<LoanRecord, _>(reader);
    let mut attached = 0_usize;
    for record in decoded.records {
        let member = MemberId(record.member_id);
        if library.find_member(member).is_none() {
            warn!("skipping loan of '{}': no member with id {member}", record.title);
            continue;
        }
        let Some(book) = library.find_book_by_title(&record.title).map(|book| book.id()) else {
            warn!("skipping loan to member {member}: no book titled '{}'", record.title);
            continue;
        };

        let result = match replay {
            ReplayMode::Checkout => library.checkout(record.checkout_date, member, book),
            ReplayMode::Restore => library.restore_loan(record.checkout_date, member, book),
        };
        match result {
            Ok(true) => attached = attached.saturating_add(1),
            Ok(false) => warn!(
                "dropped persisted loan of '{}' to member {member} from {}: refused on replay",
                record.title, record.checkout_date
            ),
            Err(e) => warn!("dropped persisted loan of '{}': {e}", record.title),
        }
    }
    report_stop("open loans", decoded.stopped_by);
    attached
}
