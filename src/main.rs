//! Demo: load the library, print its reports, save it back.

use std::{env, error::Error, fs::File, path::PathBuf};

use chrono::{Days, Local, NaiveDate};
use lending_system::{LendingConfig, LendingError, Library, LibraryStore, MemberId, Report};
use log::{info, warn};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger};

/// Config file read when no path is given
const DEFAULT_CONFIG_PATH: &str = "lending.toml";

/// Log to the configured file, or to stderr when none is set
fn init_logging(config: &LendingConfig) {
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    let installed = match config.log_file.as_ref().map(File::create) {
        Some(Ok(file)) => WriteLogger::init(LevelFilter::Debug, log_config, file),
        Some(Err(e)) => {
            eprintln!("cannot create log file, logging to stderr: {e}");
            TermLogger::init(LevelFilter::Info, log_config, TerminalMode::Stderr, ColorChoice::Auto)
        }
        None => {
            TermLogger::init(LevelFilter::Info, log_config, TerminalMode::Stderr, ColorChoice::Auto)
        }
    };
    if let Err(e) = installed {
        eprintln!("logger not installed: {e}");
    }
}

/// Fill an empty library with a couple of members, books and loans
fn seed_demo(library: &mut Library, today: NaiveDate) -> Result<(), LendingError> {
    let ana = library.register_student(MemberId(30_111_222), "Ana Gómez", "Computer Science")?;
    let beto = library.register_teacher(MemberId(20_333_444), "Beto Ruiz", "Mathematics")?;
    let clean_code = library.register_book("Clean Code", 1, "Prentice Hall", 2008);
    let dune = library.register_book("Dune", 1, "Chilton", 1965);
    library.register_book("Emma", 3, "John Murray", 1815);

    let month_ago = today.checked_sub_days(Days::new(30)).unwrap_or(today);
    library.checkout(month_ago, ana, clean_code)?;
    library.checkout(today, beto, dune)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let config_path =
        env::args().nth(1).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = LendingConfig::load(&config_path)?;
    init_logging(&config);

    let store = LibraryStore::new(config);
    let mut library = store.load();
    let today = Local::now().date_naive();

    if library.member_count() == 0 {
        info!("empty library, seeding demo data");
        seed_demo(&mut library, today)?;
    }

    println!("=== {library} ===\n");
    println!("Members:\n{}", Report::member_list(&library));
    println!("Books:\n{}", Report::book_list(&library));
    println!("{}\n", Report::overdue_loans(&library, today));
    println!("{}\n", Report::responsible_teachers(&library, today));

    // Try to borrow a book that is already out, and explain the refusal
    let busy_book = library.books().find(|book| book.is_on_loan()).map(|book| book.id());
    let first_member = library.members().next().map(|member| member.id());
    if let (Some(book), Some(member)) = (busy_book, first_member) {
        if !library.checkout(today, member, book)? {
            let reasons = library.refusal_reasons(today, member, book)?;
            println!("{}", Report::refusal_message(&reasons));
        }
        println!("{}\n", Report::who_has(&library, book)?);
    }

    println!("{}", Report::summary_json(&library, today)?);

    if !store.save(&library) {
        warn!("some streams could not be saved");
    }
    Ok(())
}
