//! Sort specification for the user listing.
//!
//! Raw query parameters are resolved here into closed enums, so only static column
//! names and keywords ever reach the SQL text.

use std::cmp::Ordering;

use super::types::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    FirstName,
    LastName,
    Email,
    LastLoginDate,
    RegistrationDate,
    Status,
}

impl SortField {
    /// Anything outside the allow-list falls back to `lastLoginDate`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("id") => SortField::Id,
            Some("firstName") => SortField::FirstName,
            Some("lastName") => SortField::LastName,
            Some("email") => SortField::Email,
            Some("lastLoginDate") => SortField::LastLoginDate,
            Some("registrationDate") => SortField::RegistrationDate,
            Some("status") => SortField::Status,
            _ => SortField::LastLoginDate,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::FirstName => "first_name",
            SortField::LastName => "last_name",
            SortField::Email => "email",
            SortField::LastLoginDate => "last_login_date",
            SortField::RegistrationDate => "registration_date",
            SortField::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// `ASC`/`DESC` in any case; everything else is `DESC`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("ASC") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn apply(&self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::LastLoginDate,
            order: SortOrder::Desc,
        }
    }
}

impl SortSpec {
    pub fn resolve(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        Self {
            field: SortField::parse(sort_by),
            order: SortOrder::parse(sort_order),
        }
    }

    /// Body of the `ORDER BY` clause.
    ///
    /// `lastLoginDate`: never-logged-in rows last in either direction, then the
    /// requested direction, ties by registration date in the same direction.
    /// Every other key: ties by registration date, newest first.
    pub fn order_by_clause(&self) -> String {
        let dir = self.order.keyword();
        match self.field {
            SortField::LastLoginDate => format!(
                "last_login_date IS NULL, last_login_date {dir}, registration_date {dir}"
            ),
            field => format!("{} {dir}, registration_date DESC", field.column()),
        }
    }

    /// In-process equivalent of [`SortSpec::order_by_clause`].
    pub fn compare(&self, a: &User, b: &User) -> Ordering {
        match self.field {
            SortField::LastLoginDate => match (a.last_login_date, b.last_login_date) {
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (x, y) => self
                    .order
                    .apply(x.cmp(&y))
                    .then_with(|| self.order.apply(a.registration_date.cmp(&b.registration_date))),
            },
            field => {
                let primary = match field {
                    SortField::Id => a.id.cmp(&b.id),
                    SortField::FirstName => a.first_name.cmp(&b.first_name),
                    SortField::LastName => a.last_name.cmp(&b.last_name),
                    SortField::Email => a.email.cmp(&b.email),
                    SortField::RegistrationDate => a.registration_date.cmp(&b.registration_date),
                    SortField::Status => a.status.cmp(&b.status),
                    SortField::LastLoginDate => Ordering::Equal,
                };
                self.order
                    .apply(primary)
                    .then_with(|| b.registration_date.cmp(&a.registration_date))
            }
        }
    }
}
