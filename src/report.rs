use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    book::BookId,
    events::CheckoutRefusal,
    library::{LendingError, Library},
};

/// Separator printed between loans in the overdue report
const LOAN_SEPARATOR: &str = "---------------------------------";

/// Counters describing a library at a given day
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LibrarySummary {
    /// Library name
    pub library: String,
    /// Day the counters were computed for
    pub as_of: NaiveDate,
    /// Registered students
    pub students: usize,
    /// Registered teachers
    pub teachers: usize,
    /// Registered book exemplars
    pub books: usize,
    /// Exemplars currently out
    pub books_on_loan: usize,
    /// Open loans past due
    pub overdue_loans: usize,
    /// Teachers with a clean return record
    pub responsible_teachers: usize,
}

/// Plain-text and JSON renderings of library state
#[derive(Debug)]
pub struct Report;

impl Report {
    /// One line per member
    #[must_use]
    pub fn member_list(library: &Library) -> String {
        let mut list = String::new();
        for member in library.members() {
            list.push_str(&format!("{member}\n"));
        }
        list
    }

    /// Numbered list of books with their loan status
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)]
    pub fn book_list(library: &Library) -> String {
        let mut list = String::new();
        for (i, book) in library.books().enumerate() {
            list.push_str(&format!("{}) {book}\n", i + 1));
        }
        list
    }

    /// One title per line
    #[must_use]
    pub fn title_list(library: &Library) -> String {
        let mut list = String::new();
        for book in library.books() {
            list.push_str(book.title());
            list.push('\n');
        }
        list
    }

    /// Open loans past due at `reference`
    #[must_use]
    pub fn overdue_loans(library: &Library, reference: NaiveDate) -> String {
        let overdue = library.overdue_loans(reference);
        if overdue.is_empty() {
            return "No overdue loans to date.".to_string();
        }

        let mut report = String::from("--- OVERDUE LOANS ---\n\n");
        for loan in overdue {
            report.push_str(&format!("{loan}\n{LOAN_SEPARATOR}\n"));
        }
        report
    }

    /// Teachers with a clean return record at `today`
    #[must_use]
    pub fn responsible_teachers(library: &Library, today: NaiveDate) -> String {
        let teachers = library.responsible_teachers(today);
        if teachers.is_empty() {
            return "No responsible teachers.".to_string();
        }

        let mut list = String::from("--- RESPONSIBLE TEACHERS ---\n\n");
        for teacher in teachers {
            list.push_str(&format!("{teacher}\n"));
        }
        list
    }

    /// Sentence naming the holder of a book
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotOnLoan` if the book is on the shelf, and
    /// `LendingError::UnknownBook` for an unknown identifier.
    pub fn who_has(library: &Library, book: BookId) -> Result<String, LendingError> {
        let holder = library.who_has(book)?;
        let title = library.book(book).map_or("", |view| view.title());
        Ok(format!("The book '{title}' is held by: {holder}"))
    }

    /// Diagnostic for a refused checkout
    #[must_use]
    pub fn refusal_message(reasons: &[CheckoutRefusal]) -> String {
        let mut message = String::from("Error: the loan could not be made.\n");
        for reason in reasons {
            message.push_str(&format!("- {}\n", reason.get_description()));
        }
        message
    }

    /// Counters for the library at `today`
    #[must_use]
    pub fn summary(library: &Library, today: NaiveDate) -> LibrarySummary {
        LibrarySummary {
            library: library.name().to_string(),
            as_of: today,
            students: library.count_by_role("Student"),
            teachers: library.count_by_role("Teacher"),
            books: library.book_count(),
            books_on_loan: library.books().filter(|book| book.is_on_loan()).count(),
            overdue_loans: library.overdue_loans(today).len(),
            responsible_teachers: library.responsible_teachers(today).len(),
        }
    }

    /// The summary as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn summary_json(library: &Library, today: NaiveDate) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::summary(library, today))
    }
}
