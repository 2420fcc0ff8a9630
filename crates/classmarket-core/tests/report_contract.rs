//! Integration tests for the consistency report
//!
//! Runs against the in-memory SurrealDB engine; each test seeds its own
//! store and checks the gathered snapshot and the rendered text.

use chrono::{Duration, Utc};
use classmarket_core::{StoreReport, RECENT_PURCHASE_LIMIT};
use classmarket_state::{
    ClassRecord, PasswordHash, ProductRecord, PurchaseRecord, StoreHandle, StudentRecord,
    TeacherRecord,
};
use surrealdb::sql::Thing;

#[tokio::test]
async fn test_empty_store_advisory_ignores_products_and_purchases() {
    let handle = StoreHandle::connect_memory().await.unwrap();

    // Leftovers from a prior deployment: products and purchases exist,
    // but classes/students/teachers were reset.
    handle
        .insert_product(ProductRecord::new("Pencil", 2.0, "HB pencil"))
        .await
        .unwrap();
    handle
        .insert_purchase(PurchaseRecord::new("Noa", "Pencil", 2.0))
        .await
        .unwrap();

    let report = StoreReport::gather(&handle).await.unwrap();
    assert!(report.is_store_empty());

    let text = report.render();
    assert!(text.contains("Store is empty. Run the main application to initialize it."));
    assert!(text.contains("Products:  1"));
    assert!(text.contains("Purchases: 1"));
}

#[tokio::test]
async fn test_populated_store_has_no_advisory() {
    let handle = StoreHandle::connect_memory().await.unwrap();
    handle
        .insert_class(ClassRecord::new("8-3", "Room 8-3"))
        .await
        .unwrap();

    let report = StoreReport::gather(&handle).await.unwrap();
    assert!(!report.is_store_empty());
    assert!(!report.render().contains("Store is empty"));
}

#[tokio::test]
async fn test_listing_sections_gated_on_nonempty_collections() {
    let handle = StoreHandle::connect_memory().await.unwrap();
    handle
        .insert_class(ClassRecord::new("8-3", "Room 8-3"))
        .await
        .unwrap();

    let text = StoreReport::gather(&handle).await.unwrap().render();
    assert!(text.contains("\nClasses:\n"));
    assert!(!text.contains("\nStudents:\n"));
    assert!(!text.contains("\nTeachers:\n"));
    assert!(!text.contains("\nProducts:\n"));
    assert!(!text.contains("Recent purchases"));
}

#[tokio::test]
async fn test_purchase_listing_limit_and_order() {
    let handle = StoreHandle::connect_memory().await.unwrap();
    let base = Utc::now();

    for i in 1..=12i64 {
        handle
            .insert_purchase(
                PurchaseRecord::new(&format!("buyer-{:02}", i), "Sticker", 1.0)
                    .with_created_at(base + Duration::seconds(i)),
            )
            .await
            .unwrap();
    }

    let report = StoreReport::gather(&handle).await.unwrap();
    assert_eq!(report.recent_purchases.len(), RECENT_PURCHASE_LIMIT);

    // Newest first: 12 down to 3; 1 and 2 fall off the end.
    let buyers: Vec<&str> = report
        .recent_purchases
        .iter()
        .map(|p| p.student_name.as_str())
        .collect();
    let expected: Vec<String> = (3..=12i64).rev().map(|i| format!("buyer-{:02}", i)).collect();
    assert_eq!(
        buyers,
        expected.iter().map(String::as_str).collect::<Vec<_>>()
    );

    let text = report.render();
    assert!(!text.contains("buyer-01"));
    assert!(!text.contains("buyer-02"));
}

#[tokio::test]
async fn test_status_labels_are_total() {
    let handle = StoreHandle::connect_memory().await.unwrap();
    let base = Utc::now();

    handle
        .insert_purchase(
            PurchaseRecord::new("Noa", "Eraser", 3.0)
                .with_status("pending")
                .with_created_at(base),
        )
        .await
        .unwrap();
    handle
        .insert_purchase(
            PurchaseRecord::new("Omer", "Ruler", 4.0)
                .with_status("approved")
                .with_created_at(base + Duration::seconds(1)),
        )
        .await
        .unwrap();
    handle
        .insert_purchase(
            PurchaseRecord::new("Dana", "Marker", 5.0)
                .with_status("refunded")
                .with_created_at(base + Duration::seconds(2)),
        )
        .await
        .unwrap();

    let text = StoreReport::gather(&handle).await.unwrap().render();
    assert!(text.contains("Noa purchased Eraser (3) - pending"));
    assert!(text.contains("Omer purchased Ruler (4) - approved"));
    assert!(text.contains("Dana purchased Marker (5) - rejected"));
}

#[tokio::test]
async fn test_unassigned_and_dangling_render_the_same() {
    let handle = StoreHandle::connect_memory().await.unwrap();

    handle
        .insert_student(StudentRecord::new("Omer", 10.0))
        .await
        .unwrap();
    handle
        .insert_student(
            StudentRecord::new("Dana", 5.0).with_class(Thing::from(("classes", "deleted"))),
        )
        .await
        .unwrap();

    let report = StoreReport::gather(&handle).await.unwrap();
    assert_eq!(report.dangling_references(), 1);

    let text = report.render();
    let unassigned_lines = text
        .lines()
        .filter(|l| l.contains("class: unassigned"))
        .count();
    assert_eq!(unassigned_lines, 2);
}

#[tokio::test]
async fn test_credentials_never_rendered() {
    let handle = StoreHandle::connect_memory().await.unwrap();

    let hash = PasswordHash::derive("top-secret");
    let encoded = hash.encode();
    handle
        .insert_student(StudentRecord::new("Noa", 40.0).with_password(encoded.clone()))
        .await
        .unwrap();
    handle
        .insert_teacher(TeacherRecord::new(None))
        .await
        .unwrap();

    let text = StoreReport::gather(&handle).await.unwrap().render();
    assert!(text.contains("Noa | balance: 40 | class: unassigned | password: set"));
    assert!(text.contains("(unnamed) | class: unassigned | password: none"));
    assert!(!text.contains("top-secret"));
    assert!(!text.contains(&encoded));
}

#[tokio::test]
async fn test_header_counts_cover_all_collections() {
    let handle = StoreHandle::connect_memory().await.unwrap();

    let class = handle
        .insert_class(ClassRecord::new("8-3", "Room 8-3"))
        .await
        .unwrap();
    let class_id = class.id.clone().unwrap();

    handle
        .insert_student(StudentRecord::new("Noa", 40.0).with_class(class_id.clone()))
        .await
        .unwrap();
    handle
        .insert_teacher(TeacherRecord::new(Some("Mor")).with_class(class_id.clone()))
        .await
        .unwrap();
    handle
        .insert_product(ProductRecord::new("Pencil", 2.0, "HB").with_class(class_id))
        .await
        .unwrap();

    let text = StoreReport::gather(&handle).await.unwrap().render();
    assert!(text.contains("Classes:   1"));
    assert!(text.contains("Students:  1"));
    assert!(text.contains("Teachers:  1"));
    assert!(text.contains("Products:  1"));
    assert!(text.contains("Purchases: 0"));
    assert!(text.contains("Noa | balance: 40 | class: 8-3"));
    assert!(text.contains("Mor | class: 8-3"));
    assert!(text.contains("Pencil | price: 2 | class: 8-3"));
}
