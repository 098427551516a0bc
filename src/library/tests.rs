use std::{cell::RefCell, rc::Rc};

use chrono::NaiveDate;

use crate::{
    book::BookId,
    events::{CheckoutRefusal, LendingEvent},
    library::{LendingError, Library},
    member::{Classification, MemberId, STUDENT_LOAN_DAYS, TEACHER_LOAN_DAYS},
    observers::LendingObserver,
};

/// Build a date from literal parts
#[allow(clippy::expect_used)]
fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

/// A student "Ana", a teacher "Beto" and four books
#[allow(clippy::expect_used)]
fn setup_test_library() -> (Library, [BookId; 4]) {
    let mut library = Library::new("test-library");
    library.register_student(MemberId(1), "Ana", "CS").expect("fresh id");
    library.register_teacher(MemberId(2), "Beto", "Math").expect("fresh id");

    let books = [
        library.register_book("Clean Code", 1, "Pub", 2008),
        library.register_book("Refactoring", 2, "Pub", 2018),
        library.register_book("Dune", 1, "Chilton", 1965),
        library.register_book("Emma", 3, "Murray", 1815),
    ];
    (library, books)
}

/// Observer that keeps a copy of every event
#[derive(Debug, Default)]
struct RecordingObserver {
    /// Shared event sink
    events: Rc<RefCell<Vec<LendingEvent>>>,
}

impl LendingObserver for RecordingObserver {
    fn on_event(&self, event: &LendingEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[test]
#[allow(clippy::expect_used)]
fn test_registration_defaults() {
    let (library, _) = setup_test_library();

    let ana = library.find_member(MemberId(1)).expect("Ana is registered");
    assert_eq!(ana.loan_days(), STUDENT_LOAN_DAYS);
    assert_eq!(ana.classification(), Classification::Student);
    assert_eq!(ana.open_loan_count(), 0);

    let beto = library.find_member(MemberId(2)).expect("Beto is registered");
    assert_eq!(beto.loan_days(), TEACHER_LOAN_DAYS);
    assert_eq!(beto.classification(), Classification::Teacher);

    assert_eq!(library.member_count(), 2);
    assert_eq!(library.book_count(), 4);
    assert!(library.find_member(MemberId(99)).is_none());
}

#[test]
fn test_duplicate_member_id_is_refused() {
    let (mut library, _) = setup_test_library();

    let result = library.register_teacher(MemberId(1), "Someone", "Physics");
    assert_eq!(result, Err(LendingError::DuplicateMember(MemberId(1))));
    assert_eq!(library.member_count(), 2);
}

#[test]
#[allow(clippy::expect_used)]
fn test_student_due_date() {
    let (mut library, [clean_code, ..]) = setup_test_library();

    let accepted = library.checkout(date(2024, 1, 1), MemberId(1), clean_code);
    assert_eq!(accepted, Ok(true));

    let loan = library.book(clean_code).and_then(|book| book.current_loan()).expect("open loan");
    assert_eq!(loan.due_date(), date(2024, 1, 21));
    assert!(!loan.is_overdue(date(2024, 1, 20)));
    assert!(!loan.is_overdue(date(2024, 1, 21)));
    assert!(loan.is_overdue(date(2024, 1, 22)));
}

#[test]
#[allow(clippy::expect_used)]
fn test_extending_loan_days_is_retroactive() {
    let (mut library, [clean_code, ..]) = setup_test_library();
    let beto = MemberId(2);

    // Due 2024-03-06, returned one day late
    assert_eq!(library.checkout(date(2024, 3, 1), beto, clean_code), Ok(true));
    assert!(library.return_book(date(2024, 3, 7), clean_code).is_ok());

    let today = date(2024, 6, 1);
    let teacher = library.find_member(beto).expect("Beto is registered");
    assert_eq!(teacher.is_responsible(today), Some(false));

    // Two extra days move the old due date to 2024-03-08
    assert_eq!(library.extend_loan_days(beto, 2), Ok(TEACHER_LOAN_DAYS + 2));

    let teacher = library.find_member(beto).expect("Beto is registered");
    assert_eq!(teacher.is_responsible(today), Some(true));
    let loan = teacher.loans().next().expect("one historical loan");
    assert_eq!(loan.due_date(), date(2024, 3, 8));
    assert!(!loan.is_overdue(date(2024, 3, 7)));
}

#[test]
fn test_student_loan_cap() {
    let (mut library, [first, second, third, fourth]) = setup_test_library();
    let ana = MemberId(1);
    let day = date(2024, 1, 1);

    assert_eq!(library.checkout(day, ana, first), Ok(true));
    assert_eq!(library.checkout(day, ana, second), Ok(true));
    assert_eq!(library.checkout(day, ana, third), Ok(true));

    assert_eq!(library.checkout(day, ana, fourth), Ok(false));
    assert_eq!(library.book(fourth).map(|book| book.is_on_loan()), Some(false));
    assert_eq!(library.find_member(ana).map(|member| member.open_loan_count()), Some(3));
    assert_eq!(library.find_member(ana).map(|member| member.can_borrow(day)), Some(false));

    // Returning one frees a slot
    assert!(library.return_book(day, first).is_ok());
    assert_eq!(library.checkout(day, ana, fourth), Ok(true));
}

#[test]
fn test_teacher_has_no_loan_cap() {
    let (mut library, books) = setup_test_library();
    let day = date(2024, 1, 1);

    for book in books {
        assert_eq!(library.checkout(day, MemberId(2), book), Ok(true));
    }
    assert_eq!(library.find_member(MemberId(2)).map(|member| member.open_loan_count()), Some(4));
}

#[test]
fn test_overdue_open_loan_blocks_borrowing() {
    let (mut library, [first, second, ..]) = setup_test_library();
    let beto = MemberId(2);

    assert_eq!(library.checkout(date(2024, 1, 1), beto, first), Ok(true));

    // Due 2024-01-06: still fine on the 6th, blocked on the 7th
    assert_eq!(library.checkout(date(2024, 1, 6), beto, second), Ok(true));
    assert!(library.return_book(date(2024, 1, 6), second).is_ok());
    assert_eq!(library.checkout(date(2024, 1, 7), beto, second), Ok(false));

    // Bringing the late book back restores eligibility
    assert!(library.return_book(date(2024, 1, 8), first).is_ok());
    assert_eq!(library.checkout(date(2024, 1, 8), beto, second), Ok(true));
}

#[test]
fn test_refusal_reasons_report_every_cause() {
    let (mut library, [first, second, ..]) = setup_test_library();
    let late = date(2024, 2, 1);

    assert_eq!(library.checkout(date(2024, 1, 1), MemberId(1), first), Ok(true));
    assert_eq!(library.checkout(date(2024, 1, 1), MemberId(2), second), Ok(true));

    // Beto is overdue and Clean Code is with Ana
    let reasons = library.refusal_reasons(late, MemberId(2), first);
    assert_eq!(
        reasons,
        Ok(vec![CheckoutRefusal::BookOnLoan, CheckoutRefusal::MemberIneligible])
    );
    assert_eq!(library.checkout(late, MemberId(2), first), Ok(false));

    assert_eq!(
        library.refusal_reasons(late, MemberId(42), first),
        Err(LendingError::UnknownMember(MemberId(42)))
    );
    assert_eq!(
        library.checkout(late, MemberId(1), BookId(17)),
        Err(LendingError::UnknownBook(BookId(17)))
    );
}

#[test]
fn test_overdue_loans_skip_closed_loans() {
    let (mut library, [first, second, third, _]) = setup_test_library();

    // Returned late: not listed
    assert_eq!(library.checkout(date(2024, 1, 1), MemberId(2), first), Ok(true));
    assert!(library.return_book(date(2024, 1, 20), first).is_ok());

    // Open and late: listed
    assert_eq!(library.checkout(date(2024, 1, 1), MemberId(1), second), Ok(true));

    // Open and due on the reference day: not listed
    assert_eq!(library.checkout(date(2024, 1, 25), MemberId(2), third), Ok(true));

    let overdue = library.overdue_loans(date(2024, 1, 30));
    assert_eq!(overdue.len(), 1);
    assert!(overdue.iter().all(|loan| loan.book().id() == second && loan.is_open()));
}

#[test]
fn test_return_of_book_not_on_loan_fails_every_time() {
    let (mut library, [first, ..]) = setup_test_library();
    let day = date(2024, 1, 5);

    assert_eq!(library.checkout(date(2024, 1, 1), MemberId(1), first), Ok(true));
    assert!(library.return_book(day, first).is_ok());

    let expected =
        Err(LendingError::NotOnLoan { book: first, title: "Clean Code".to_string() });
    assert_eq!(library.return_book(day, first), expected);
    assert_eq!(library.return_book(day, first), expected);
}

#[test]
#[allow(clippy::expect_used)]
fn test_closing_a_loan_twice_fails() {
    let (mut library, [first, ..]) = setup_test_library();

    assert_eq!(library.checkout(date(2024, 1, 1), MemberId(1), first), Ok(true));
    let loan_id = library.return_book(date(2024, 1, 3), first).expect("book was on loan");

    let loan = library.loans.get_mut(loan_id.index()).expect("loan is in the ledger");
    let result = loan.close(date(2024, 1, 9));
    assert_eq!(
        result,
        Err(LendingError::LoanAlreadyClosed { loan: loan_id, returned: date(2024, 1, 3) })
    );
    assert_eq!(loan.status().return_date(), Some(date(2024, 1, 3)));
    assert_eq!(loan.status().get_description(), "Loan was closed on 2024/01/03");
}

#[test]
fn test_who_has_book() {
    let (mut library, [first, ..]) = setup_test_library();

    assert!(matches!(library.who_has(first), Err(LendingError::NotOnLoan { .. })));

    assert_eq!(library.checkout(date(2024, 1, 1), MemberId(2), first), Ok(true));
    assert_eq!(library.who_has(first).map(|member| member.name()), Ok("Beto"));
}

#[test]
fn test_find_book_by_title_ignores_case_and_prefers_first_exemplar() {
    let (mut library, [first, ..]) = setup_test_library();
    let copy = library.register_book("Clean Code", 2, "Other", 2010);

    assert_eq!(library.find_book_by_title("clean CODE").map(|book| book.id()), Some(first));
    assert_ne!(first, copy);
    assert!(library.find_book_by_title("Missing").is_none());
}

#[test]
fn test_count_by_role() {
    let (mut library, _) = setup_test_library();
    assert!(library.register_student(MemberId(3), "Caro", "Law").is_ok());

    assert_eq!(library.count_by_role("student"), 2);
    assert_eq!(library.count_by_role("TEACHER"), 1);
    assert_eq!(library.count_by_role("docente"), 1);
    assert_eq!(library.count_by_role("janitor"), 0);
}

#[test]
fn test_responsible_teachers() {
    let (mut library, [first, second, ..]) = setup_test_library();
    assert!(library.register_teacher(MemberId(3), "Caro", "Art").is_ok());
    let today = date(2024, 2, 1);

    // Caro has no loans and is vacuously responsible; Beto keeps a book too long
    assert_eq!(library.checkout(date(2024, 1, 1), MemberId(2), first), Ok(true));
    assert_eq!(library.checkout(date(2024, 1, 1), MemberId(1), second), Ok(true));

    let names: Vec<&str> =
        library.responsible_teachers(today).into_iter().map(|member| member.name()).collect();
    assert_eq!(names, vec!["Caro"]);

    assert_eq!(library.find_member(MemberId(1)).map(|member| member.is_responsible(today)), Some(None));
}

#[test]
fn test_students_cannot_be_rewarded() {
    let (mut library, _) = setup_test_library();

    assert_eq!(library.extend_loan_days(MemberId(1), 3), Err(LendingError::NotATeacher(MemberId(1))));
    assert_eq!(library.extend_loan_days(MemberId(9), 3), Err(LendingError::UnknownMember(MemberId(9))));
    assert_eq!(library.find_member(MemberId(1)).map(|member| member.loan_days()), Some(STUDENT_LOAN_DAYS));
}

#[test]
fn test_observers_and_history() {
    let (mut library, [first, second, ..]) = setup_test_library();
    let events = Rc::new(RefCell::new(Vec::new()));
    library.register_observer(Box::new(RecordingObserver { events: Rc::clone(&events) }));
    let day = date(2024, 1, 1);

    assert_eq!(library.checkout(day, MemberId(1), first), Ok(true));
    assert_eq!(library.checkout(day, MemberId(2), first), Ok(false));
    assert!(library.return_book(day, first).is_ok());
    assert!(library.return_book(day, second).is_err());

    let expected = vec![
        LendingEvent::CheckedOut { member: MemberId(1), book: first, date: day },
        LendingEvent::CheckoutRefused {
            member: MemberId(2),
            book: first,
            date: day,
            reasons: vec![CheckoutRefusal::BookOnLoan],
        },
        LendingEvent::Returned { member: MemberId(1), book: first, date: day },
    ];
    assert_eq!(library.history(), expected.as_slice());
    assert_eq!(*events.borrow(), expected);
}

#[test]
fn test_history_is_bounded() {
    let (mut library, [first, ..]) = setup_test_library();
    let day = date(2024, 1, 1);

    for _ in 0..60 {
        assert_eq!(library.checkout(day, MemberId(2), first), Ok(true));
        assert!(library.return_book(day, first).is_ok());
    }

    assert_eq!(library.history().len(), 100);
    assert_eq!(library.loans().count(), 60);
    assert!(matches!(library.history().last(), Some(LendingEvent::Returned { .. })));
}

#[test]
fn test_restore_loan_skips_eligibility() {
    let (mut library, [first, second, third, fourth]) = setup_test_library();
    let day = date(2024, 1, 1);

    for book in [first, second, third] {
        assert_eq!(library.checkout(day, MemberId(1), book), Ok(true));
    }
    assert_eq!(library.restore_loan(day, MemberId(1), fourth), Ok(true));
    assert_eq!(library.find_member(MemberId(1)).map(|member| member.open_loan_count()), Some(4));

    // The book itself must still be free
    assert_eq!(library.restore_loan(day, MemberId(2), fourth), Ok(false));
}
