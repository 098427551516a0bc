use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    library::{LendingError, Library},
    loan::{LoanId, LoanStatus, LoanView},
};

/// Loan allowance of every student, in days
pub const STUDENT_LOAN_DAYS: u32 = 20;

/// Starting loan allowance of a teacher, in days
pub const TEACHER_LOAN_DAYS: u32 = 5;

/// Maximum number of books a student may hold at once
pub const STUDENT_LOAN_CAP: usize = 3;

/// National identity number of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct MemberId(pub i32);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of member, used for reports and counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Classification {
    /// A student member
    Student,
    /// A teacher member
    Teacher,
}

impl Classification {
    /// Label used in reports
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Teacher => "Teacher",
        }
    }

    /// Tag written at the head of a member record
    #[must_use]
    pub fn stream_tag(self) -> &'static str {
        match self {
            Self::Student => "Estudiante",
            Self::Teacher => "Docente",
        }
    }

    /// Resolve a record tag, exact match only
    #[must_use]
    pub fn from_stream_tag(tag: &str) -> Option<Self> {
        [Self::Student, Self::Teacher].into_iter().find(|c| c.stream_tag() == tag)
    }

    /// Resolve a label or record tag, ignoring case
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        [Self::Student, Self::Teacher].into_iter().find(|c| {
            c.label().eq_ignore_ascii_case(name) || c.stream_tag().eq_ignore_ascii_case(name)
        })
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Role of a member and its role-specific data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Role {
    /// A student enrolled in a major
    Student {
        /// Field of study
        major: String,
    },
    /// A teacher attached to a department
    Teacher {
        /// Academic department
        department: String,
    },
}

impl Role {
    /// Classification of this role
    #[must_use]
    pub fn classification(&self) -> Classification {
        match self {
            Self::Student { .. } => Classification::Student,
            Self::Teacher { .. } => Classification::Teacher,
        }
    }

    /// Allowance a new member of this role starts with
    #[must_use]
    pub fn default_loan_days(&self) -> u32 {
        match self {
            Self::Student { .. } => STUDENT_LOAN_DAYS,
            Self::Teacher { .. } => TEACHER_LOAN_DAYS,
        }
    }

    /// Maximum number of simultaneously open loans, if capped
    #[must_use]
    pub fn open_loan_cap(&self) -> Option<usize> {
        match self {
            Self::Student { .. } => Some(STUDENT_LOAN_CAP),
            Self::Teacher { .. } => None,
        }
    }

    /// Major or department
    #[must_use]
    pub fn payload(&self) -> &str {
        match self {
            Self::Student { major } => major,
            Self::Teacher { department } => department,
        }
    }
}

/// A registered patron of the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Identity number, unique among members
    id: MemberId,
    /// Display name
    name: String,
    /// Current loan allowance in days, always positive
    loan_days: u32,
    /// Student or teacher data
    role: Role,
    /// Loans in creation order
    loans: Vec<LoanId>,
}

impl Member {
    /// Create a member with the role's starting allowance and no loans
    pub(crate) fn new(id: MemberId, name: String, role: Role) -> Self {
        let loan_days = role.default_loan_days();
        Self { id, name, loan_days, role, loans: Vec::new() }
    }

    /// Identity number
    #[must_use]
    pub fn id(&self) -> MemberId {
        self.id
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current loan allowance in days
    #[must_use]
    pub fn loan_days(&self) -> u32 {
        self.loan_days
    }

    /// Role and role-specific data
    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Student or teacher
    #[must_use]
    pub fn classification(&self) -> Classification {
        self.role.classification()
    }

    /// Loan identifiers in creation order
    #[must_use]
    pub fn loan_ids(&self) -> &[LoanId] {
        &self.loans
    }

    /// Append a loan to the history
    pub(crate) fn push_loan(&mut self, loan: LoanId) {
        self.loans.push(loan);
    }

    /// Reward a teacher with extra loan days, returning the new allowance
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotATeacher` for students, whose allowance is fixed.
    pub(crate) fn extend_loan_days(&mut self, extra_days: u32) -> Result<u32, LendingError> {
        match self.role {
            Role::Teacher { .. } => {
                self.loan_days = self.loan_days.saturating_add(extra_days);
                Ok(self.loan_days)
            }
            Role::Student { .. } => Err(LendingError::NotATeacher(self.id)),
        }
    }
}

/// A member resolved against the library's loan ledger
#[derive(Debug, Clone, Copy)]
pub struct MemberView<'a> {
    /// The member record
    member: &'a Member,
    /// Owner of the loan ledger
    library: &'a Library,
}

impl<'a> MemberView<'a> {
    /// Bundle a member with the library it belongs to
    pub(crate) fn new(member: &'a Member, library: &'a Library) -> Self {
        Self { member, library }
    }

    /// The member record
    #[must_use]
    pub fn member(self) -> &'a Member {
        self.member
    }

    /// Identity number
    #[must_use]
    pub fn id(self) -> MemberId {
        self.member.id
    }

    /// Display name
    #[must_use]
    pub fn name(self) -> &'a str {
        &self.member.name
    }

    /// Current loan allowance in days
    #[must_use]
    pub fn loan_days(self) -> u32 {
        self.member.loan_days
    }

    /// Student or teacher
    #[must_use]
    pub fn classification(self) -> Classification {
        self.member.classification()
    }

    /// Every loan of the member, oldest first
    pub fn loans(self) -> impl Iterator<Item = LoanView<'a>> {
        let library = self.library;
        self.member.loans.iter().filter_map(move |id| library.loan(*id))
    }

    /// Loans whose book has not come back
    pub fn open_loans(self) -> impl Iterator<Item = LoanView<'a>> {
        self.loans().filter(|loan| loan.is_open())
    }

    /// Number of books the member currently holds
    #[must_use]
    pub fn open_loan_count(self) -> usize {
        self.open_loans().count()
    }

    /// Whether some open loan is overdue at `today`
    #[must_use]
    pub fn has_overdue_loan(self, today: NaiveDate) -> bool {
        self.open_loans().any(|loan| loan.is_overdue(today))
    }

    /// Whether the member may take another book at `today`.
    ///
    /// Nobody with an overdue open loan may borrow; students are also capped
    /// at three open loans.
    #[must_use]
    pub fn can_borrow(self, today: NaiveDate) -> bool {
        if self.has_overdue_loan(today) {
            return false;
        }
        self.member.role.open_loan_cap().is_none_or(|cap| self.open_loan_count() < cap)
    }

    /// For teachers, whether no loan ever ran late: open loans are checked at
    /// `today`, closed ones at their return date. `None` for students.
    #[must_use]
    pub fn is_responsible(self, today: NaiveDate) -> Option<bool> {
        match self.member.role {
            Role::Student { .. } => None,
            Role::Teacher { .. } => Some(self.loans().all(|loan| match loan.status() {
                LoanStatus::Open => !loan.is_overdue(today),
                LoanStatus::Closed(returned) => !loan.is_overdue(returned),
            })),
        }
    }
}

impl fmt::Display for MemberView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} || {} ({}) || Books on loan: {}",
            self.member.id,
            self.member.name,
            self.member.classification(),
            self.open_loan_count()
        )
    }
}
