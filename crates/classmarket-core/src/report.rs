//! Read-only consistency report over the classmarket store
//!
//! Gathers counts and listings for all five collections in one pass,
//! resolving class references for display, and renders a line-oriented
//! snapshot. Section order is fixed; each listing section is gated on its
//! collection being non-empty. Nothing here mutates data.

use anyhow::{Context, Result};
use classmarket_state::{
    credential_flag, ClassRecord, PurchaseRecord, ResolvedProduct, ResolvedStudent,
    ResolvedTeacher, StoreHandle,
};
use tracing::{info, warn};

/// How many purchases the report shows, newest first
pub const RECENT_PURCHASE_LIMIT: usize = 10;

/// Per-collection document counts
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityCounts {
    pub classes: u64,
    pub students: u64,
    pub teachers: u64,
    pub products: u64,
    pub purchases: u64,
}

/// A gathered snapshot of the store, ready to render
#[derive(Debug)]
pub struct StoreReport {
    pub counts: EntityCounts,
    pub classes: Vec<ClassRecord>,
    pub students: Vec<ResolvedStudent>,
    pub teachers: Vec<ResolvedTeacher>,
    pub products: Vec<ResolvedProduct>,
    pub recent_purchases: Vec<PurchaseRecord>,
}

impl StoreReport {
    /// Gather the full snapshot from the store (read-only)
    pub async fn gather(handle: &StoreHandle) -> Result<Self> {
        let counts = EntityCounts {
            classes: handle.count_classes().await.context("count classes")?,
            students: handle.count_students().await.context("count students")?,
            teachers: handle.count_teachers().await.context("count teachers")?,
            products: handle.count_products().await.context("count products")?,
            purchases: handle.count_purchases().await.context("count purchases")?,
        };

        let report = StoreReport {
            counts,
            classes: handle.list_classes().await.context("list classes")?,
            students: handle
                .list_students_resolved()
                .await
                .context("list students")?,
            teachers: handle
                .list_teachers_resolved()
                .await
                .context("list teachers")?,
            products: handle
                .list_products_resolved()
                .await
                .context("list products")?,
            recent_purchases: handle
                .recent_purchases(RECENT_PURCHASE_LIMIT)
                .await
                .context("list recent purchases")?,
        };

        // Opportunistic integrity check: dangling references are tolerated
        // at read time but worth flagging for the operator.
        let dangling = report.dangling_references();
        if dangling > 0 {
            warn!(dangling, "class references point at deleted classes");
        }

        info!(
            classes = report.counts.classes,
            students = report.counts.students,
            teachers = report.counts.teachers,
            products = report.counts.products,
            purchases = report.counts.purchases,
            "store snapshot gathered"
        );

        Ok(report)
    }

    /// The empty-store advisory checks classes, students and teachers
    /// only; products and purchases may legitimately survive a reset.
    pub fn is_store_empty(&self) -> bool {
        self.counts.classes == 0 && self.counts.students == 0 && self.counts.teachers == 0
    }

    /// Number of dangling class references across the resolved listings
    pub fn dangling_references(&self) -> usize {
        self.students.iter().filter(|s| s.class.is_dangling()).count()
            + self.teachers.iter().filter(|t| t.class.is_dangling()).count()
            + self.products.iter().filter(|p| p.class.is_dangling()).count()
    }

    /// Render the report as line-oriented text
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("Store Statistics\n");
        out.push_str("================\n");
        out.push_str(&format!("Classes:   {}\n", self.counts.classes));
        out.push_str(&format!("Students:  {}\n", self.counts.students));
        out.push_str(&format!("Teachers:  {}\n", self.counts.teachers));
        out.push_str(&format!("Products:  {}\n", self.counts.products));
        out.push_str(&format!("Purchases: {}\n", self.counts.purchases));
        out.push_str("================\n");

        if !self.classes.is_empty() {
            out.push_str("\nClasses:\n");
            for class in &self.classes {
                let id = class
                    .id
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                out.push_str(&format!("  - {} (id: {})\n", class.name, id));
            }
        }

        if !self.students.is_empty() {
            out.push_str("\nStudents:\n");
            for student in &self.students {
                out.push_str(&format!(
                    "  - {} | balance: {} | class: {} | password: {}\n",
                    student.record.name,
                    student.record.balance,
                    student.class.display_name(),
                    credential_flag(&student.record.password),
                ));
            }
        }

        if !self.teachers.is_empty() {
            out.push_str("\nTeachers:\n");
            for teacher in &self.teachers {
                let name = teacher.record.name.as_deref().unwrap_or("(unnamed)");
                out.push_str(&format!(
                    "  - {} | class: {} | password: {}\n",
                    name,
                    teacher.class.display_name(),
                    credential_flag(&teacher.record.password),
                ));
            }
        }

        if !self.products.is_empty() {
            out.push_str("\nProducts:\n");
            for product in &self.products {
                out.push_str(&format!(
                    "  - {} | price: {} | class: {}\n",
                    product.record.name,
                    product.record.price,
                    product.class.display_name(),
                ));
            }
        }

        if !self.recent_purchases.is_empty() {
            out.push_str(&format!(
                "\nRecent purchases (last {}):\n",
                RECENT_PURCHASE_LIMIT
            ));
            for purchase in &self.recent_purchases {
                out.push_str(&format!(
                    "  - {} purchased {} ({}) - {}\n",
                    purchase.student_name,
                    purchase.product_name,
                    purchase.price,
                    purchase.parsed_status().label(),
                ));
            }
        }

        if self.is_store_empty() {
            out.push_str("\nStore is empty. Run the main application to initialize it.\n");
        }

        out
    }
}
