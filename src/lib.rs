//! Library lending system: members, books and the loans between them.
//!
//! This crate provides the lending rules (who may borrow, what is overdue,
//! which teachers return on time) and a binary stream format that carries
//! members, books and open loans across restarts.

pub mod book;
pub mod codec;
pub mod config;
pub mod events;
pub mod library;
pub mod loan;
pub mod member;
pub mod observers;
pub mod persistence;
pub mod report;

pub use book::{Book, BookId, BookView};
pub use config::{LendingConfig, ReplayMode};
pub use events::{CheckoutRefusal, LendingEvent};
pub use library::{LendingError, Library};
pub use loan::{Loan, LoanId, LoanStatus, LoanView};
pub use member::{Classification, Member, MemberId, MemberView, Role};
pub use persistence::LibraryStore;
pub use report::Report;
