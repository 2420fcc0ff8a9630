//! Record definitions for the classmarket SurrealDB tables
//!
//! Tables:
//! - classes: the organizational grouping every other entity may belong to
//! - students: marketplace participants with a point balance
//! - teachers: staff accounts
//! - products: items offered in the store
//! - purchases: point-in-time purchase records (denormalized snapshots)

use chrono::{DateTime, Utc};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

/// Class record - the single grouping all dependents may reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRecord {
    /// SurrealDB record ID
    pub id: Option<Thing>,
    /// Class name (not guaranteed unique)
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Created timestamp
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ClassRecord {
    /// Create a new class record
    pub fn new(name: &str, description: &str) -> Self {
        ClassRecord {
            id: None,
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Student record - a marketplace participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    /// SurrealDB record ID
    pub id: Option<Thing>,
    /// Student name
    pub name: String,
    /// Encoded salted credential hash (`salt$hexdigest`), if any
    pub password: Option<String>,
    /// Point balance
    pub balance: f64,
    /// Optional reference to the owning class
    pub class_id: Option<Thing>,
}

impl StudentRecord {
    /// Create a new student record with no class assignment
    pub fn new(name: &str, balance: f64) -> Self {
        StudentRecord {
            id: None,
            name: name.to_string(),
            password: None,
            balance,
            class_id: None,
        }
    }

    /// Attach an encoded credential hash
    pub fn with_password(mut self, encoded: String) -> Self {
        self.password = Some(encoded);
        self
    }

    /// Assign the student to a class
    pub fn with_class(mut self, class_id: Thing) -> Self {
        self.class_id = Some(class_id);
        self
    }
}

/// Teacher record - a staff account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherRecord {
    /// SurrealDB record ID
    pub id: Option<Thing>,
    /// Teacher name; older records may lack one
    pub name: Option<String>,
    /// Encoded salted credential hash (`salt$hexdigest`), if any
    pub password: Option<String>,
    /// Optional reference to the owning class
    pub class_id: Option<Thing>,
    /// Created timestamp
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl TeacherRecord {
    /// Create a new teacher record
    pub fn new(name: Option<&str>) -> Self {
        TeacherRecord {
            id: None,
            name: name.map(String::from),
            password: None,
            class_id: None,
            created_at: Utc::now(),
        }
    }

    /// Attach an encoded credential hash
    pub fn with_password(mut self, encoded: String) -> Self {
        self.password = Some(encoded);
        self
    }

    /// Assign the teacher to a class
    pub fn with_class(mut self, class_id: Thing) -> Self {
        self.class_id = Some(class_id);
        self
    }
}

/// Product record - an item offered in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    /// SurrealDB record ID
    pub id: Option<Thing>,
    /// Product name
    pub name: String,
    /// Price in points
    pub price: f64,
    /// Free-form description
    pub description: String,
    /// Image URL or path
    pub image: String,
    /// Optional reference to the owning class
    pub class_id: Option<Thing>,
    /// Created timestamp
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Create a new product record
    pub fn new(name: &str, price: f64, description: &str) -> Self {
        ProductRecord {
            id: None,
            name: name.to_string(),
            price,
            description: description.to_string(),
            image: String::new(),
            class_id: None,
            created_at: Utc::now(),
        }
    }

    /// Assign the product to a class
    pub fn with_class(mut self, class_id: Thing) -> Self {
        self.class_id = Some(class_id);
        self
    }
}

/// Purchase record - a denormalized point-in-time snapshot
///
/// `student_name`, `product_name` and `price` are copied at purchase time
/// and may diverge from the current student/product records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// SurrealDB record ID
    pub id: Option<Thing>,
    /// Reference to the purchasing student
    pub student_id: Option<Thing>,
    /// Student name at purchase time
    pub student_name: String,
    /// Reference to the purchased product
    pub product_id: Option<Thing>,
    /// Product name at purchase time
    pub product_name: String,
    /// Price at purchase time
    pub price: f64,
    /// Optional reference to the owning class
    pub class_id: Option<Thing>,
    /// Approval status: "pending" | "approved" | "rejected"
    pub status: String,
    /// Created timestamp
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    /// Approval timestamp, if the purchase left the pending state
    #[serde(default, with = "surreal_datetime_opt")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl PurchaseRecord {
    /// Create a new pending purchase record
    pub fn new(student_name: &str, product_name: &str, price: f64) -> Self {
        PurchaseRecord {
            id: None,
            student_id: None,
            student_name: student_name.to_string(),
            product_id: None,
            product_name: product_name.to_string(),
            price,
            class_id: None,
            status: PurchaseStatus::Pending.label().to_string(),
            created_at: Utc::now(),
            approved_at: None,
        }
    }

    /// Override the status string (stored values are not validated)
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    /// Override the creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Assign the purchase to a class
    pub fn with_class(mut self, class_id: Thing) -> Self {
        self.class_id = Some(class_id);
        self
    }

    /// The status parsed into the closed enumeration
    pub fn parsed_status(&self) -> PurchaseStatus {
        PurchaseStatus::parse(&self.status)
    }
}

/// Closed purchase status enumeration
///
/// The store is schema-flexible, so persisted status strings are not
/// trusted: anything other than "pending" or "approved" parses as
/// `Rejected` with no fourth branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Approved,
    Rejected,
}

impl PurchaseStatus {
    /// Total mapping from a stored status string
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => PurchaseStatus::Pending,
            "approved" => PurchaseStatus::Approved,
            _ => PurchaseStatus::Rejected,
        }
    }

    /// Display label for reports
    pub fn label(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Approved => "approved",
            PurchaseStatus::Rejected => "rejected",
        }
    }
}

/// Outcome of resolving a `class_id` reference against the classes table
///
/// "Never assigned" and "assigned to a deleted class" are distinct
/// variants; both render as "unassigned" in reports.
#[derive(Debug, Clone)]
pub enum ClassRef {
    /// The reference resolved to an existing class
    Resolved(ClassRecord),
    /// The record carries no class reference
    Unassigned,
    /// The reference points at a class that no longer exists
    Dangling(Thing),
}

impl ClassRef {
    /// Resolve an optional reference against a lookup of existing classes
    pub fn resolve<'a, F>(class_id: &Option<Thing>, lookup: F) -> Self
    where
        F: Fn(&Thing) -> Option<&'a ClassRecord>,
    {
        match class_id {
            None => ClassRef::Unassigned,
            Some(id) => match lookup(id) {
                Some(class) => ClassRef::Resolved(class.clone()),
                None => ClassRef::Dangling(id.clone()),
            },
        }
    }

    /// Display name for reports
    pub fn display_name(&self) -> &str {
        match self {
            ClassRef::Resolved(class) => &class.name,
            ClassRef::Unassigned | ClassRef::Dangling(_) => "unassigned",
        }
    }

    /// Whether the reference points at a deleted class
    pub fn is_dangling(&self) -> bool {
        matches!(self, ClassRef::Dangling(_))
    }
}
