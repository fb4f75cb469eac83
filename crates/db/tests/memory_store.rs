//! Behaviour of the in-memory schedule store.

use assert_matches::assert_matches;
use chrono::NaiveDate;
use timetable_core::adjustment::{ApplyRequest, Solution};
use timetable_core::calendar::{Day, TimeSlot, WorkingWeek};
use timetable_core::error::CoreError;
use timetable_core::schedule::{NewScheduleEntry, OverrideChange};
use timetable_db::store::{MemoryStore, SaveOutcome, ScheduleStore, StoreError};

fn slot(h: u8) -> TimeSlot {
    TimeSlot::new(h).unwrap()
}

/// 2025-03-10 is a Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn entry(course: &str, faculty: &str, room: &str, day: Day, hour: u8) -> NewScheduleEntry {
    NewScheduleEntry {
        course: course.into(),
        faculty: faculty.into(),
        room: room.into(),
        day,
        slot: slot(hour),
    }
}

async fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .save_section(
            "CS-A",
            &[
                entry("Math", "Alice", "R1", Day::Monday, 9),
                entry("Phys", "Bob", "R1", Day::Monday, 10),
            ],
            false,
        )
        .await
        .unwrap();
    store
        .save_section("CS-B", &[entry("Chem", "Carol", "R2", Day::Monday, 9)], false)
        .await
        .unwrap();
    store
}

async fn entry_id(store: &MemoryStore, section: &str, course: &str) -> i64 {
    store.list_all().await.unwrap()[section]
        .iter()
        .find(|e| e.course == course)
        .unwrap()
        .id
}

#[tokio::test]
async fn save_and_list_sections() {
    let store = seeded().await;
    let all = store.list_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["CS-A"].len(), 2);
    assert_eq!(all["CS-A"][0].course, "Math");
    assert_eq!(all["CS-A"][0].slot, slot(9));
}

#[tokio::test]
async fn duplicate_section_requires_overwrite() {
    let store = seeded().await;
    let again = [entry("Bio", "Dave", "R3", Day::Friday, 9)];

    assert_matches!(
        store.save_section("CS-A", &again, false).await,
        Err(StoreError::Core(CoreError::DuplicateSection(_)))
    );
    assert_eq!(
        store.save_section("CS-A", &again, true).await.unwrap(),
        SaveOutcome::Replaced
    );
    let all = store.list_all().await.unwrap();
    assert_eq!(all["CS-A"].len(), 1);
    assert_eq!(all["CS-A"][0].course, "Bio");
}

#[tokio::test]
async fn cross_section_double_booking_is_rejected() {
    let store = seeded().await;
    let result = store
        .save_section("CS-C", &[entry("Art", "Alice", "R9", Day::Monday, 9)], false)
        .await;
    assert_matches!(result, Err(StoreError::Core(CoreError::Conflict(_))));
    assert!(!store.list_all().await.unwrap().contains_key("CS-C"));
}

#[tokio::test]
async fn delete_section_removes_entries_and_overrides() {
    let store = seeded().await;
    let math = entry_id(&store, "CS-A", "Math").await;
    store
        .apply_solution(
            &ApplyRequest {
                entry_id: math,
                solution: Solution::substitute(monday(), "Dave"),
                persist_permanently: false,
            },
            &WorkingWeek::default(),
        )
        .await
        .unwrap();

    store.delete_section("CS-A").await.unwrap();
    assert!(store.all_overrides().await.unwrap().is_empty());
    assert_eq!(store.all_entries().await.unwrap().len(), 1);
    assert_matches!(
        store.delete_section("CS-A").await,
        Err(StoreError::Core(CoreError::NotFound { .. }))
    );
}

#[tokio::test]
async fn applying_twice_is_rejected_and_store_unchanged() {
    let store = seeded().await;
    let math = entry_id(&store, "CS-A", "Math").await;
    let request = ApplyRequest {
        entry_id: math,
        solution: Solution::substitute(monday(), "Dave"),
        persist_permanently: false,
    };
    let week = WorkingWeek::default();

    let first = store.apply_solution(&request, &week).await.unwrap();
    assert_eq!(first.override_date, monday());
    let before = store.all_overrides().await.unwrap();

    assert_matches!(
        store.apply_solution(&request, &week).await,
        Err(StoreError::Core(CoreError::ConflictAlreadyResolved { .. }))
    );
    assert_eq!(store.all_overrides().await.unwrap(), before);
}

#[tokio::test]
async fn concurrent_applies_commit_exactly_once() {
    let store = std::sync::Arc::new(seeded().await);
    let math = entry_id(&store, "CS-A", "Math").await;

    let handles: Vec<_> = ["Dave", "Erin", "Frank", "Gina"]
        .into_iter()
        .map(|teacher| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .apply_solution(
                        &ApplyRequest {
                            entry_id: math,
                            solution: Solution::substitute(monday(), teacher),
                            persist_permanently: false,
                        },
                        &WorkingWeek::default(),
                    )
                    .await
                    .is_ok()
            })
        })
        .collect();

    let mut successes = 0;
    for h in handles {
        if h.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(store.all_overrides().await.unwrap().len(), 1);
}

#[tokio::test]
async fn permanent_substitute_rewrites_weekly_entry() {
    let store = seeded().await;
    let math = entry_id(&store, "CS-A", "Math").await;
    store
        .apply_solution(
            &ApplyRequest {
                entry_id: math,
                solution: Solution::substitute(monday(), "Dave"),
                persist_permanently: true,
            },
            &WorkingWeek::default(),
        )
        .await
        .unwrap();

    let updated = store.find_entry(math).await.unwrap().unwrap();
    assert_eq!(updated.faculty, "Dave");
    assert_eq!(store.entries_for_faculty("Dave").await.unwrap().len(), 1);
    assert!(store.entries_for_faculty("Alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn permanent_reschedule_applied_twice_is_already_resolved() {
    let store = seeded().await;
    let math = entry_id(&store, "CS-A", "Math").await;
    let request = ApplyRequest {
        entry_id: math,
        solution: Solution::reschedule(monday(), Day::Thursday, slot(14), "R1"),
        persist_permanently: true,
    };
    let week = WorkingWeek::default();

    let first = store.apply_solution(&request, &week).await.unwrap();
    assert_eq!(first.original_day, Day::Monday);
    assert_eq!(first.original_time_slot, slot(9));
    let moved = store.find_entry(math).await.unwrap().unwrap();
    assert_eq!((moved.day, moved.slot), (Day::Thursday, slot(14)));

    assert_matches!(
        store.apply_solution(&request, &week).await,
        Err(StoreError::Core(CoreError::ConflictAlreadyResolved { date, .. })) if date == monday()
    );
    assert_eq!(store.all_overrides().await.unwrap().len(), 1);

    // Thursday's view still names the Monday class that was moved.
    let thursday = NaiveDate::from_ymd_opt(2025, 3, 13).unwrap();
    let view = store.view_on_date("CS-A", thursday).await.unwrap();
    assert_eq!(view.overrides.len(), 1);
    assert_eq!(view.overrides[0].original.day, Day::Monday);
    assert_eq!(view.overrides[0].original.slot, slot(9));
}

#[tokio::test]
async fn view_on_date_shows_overrides_for_that_day() {
    let store = seeded().await;
    let math = entry_id(&store, "CS-A", "Math").await;
    store
        .apply_solution(
            &ApplyRequest {
                entry_id: math,
                solution: Solution::reschedule(monday(), Day::Wednesday, slot(11), "R1"),
                persist_permanently: false,
            },
            &WorkingWeek::default(),
        )
        .await
        .unwrap();

    let view = store.view_on_date("CS-A", monday()).await.unwrap();
    assert_eq!(view.day, Some(Day::Monday));
    assert_eq!(view.entries.len(), 2);
    assert_eq!(view.overrides.len(), 1);
    assert_eq!(view.overrides[0].original.course, "Math");
    assert_matches!(
        view.overrides[0].record.change,
        OverrideChange::Reschedule { new_day: Day::Wednesday, .. }
    );

    let next_week = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
    assert!(store
        .view_on_date("CS-A", next_week)
        .await
        .unwrap()
        .overrides
        .is_empty());

    assert_matches!(
        store.view_on_date("CS-Z", monday()).await,
        Err(StoreError::Core(CoreError::NotFound { .. }))
    );
}

#[tokio::test]
async fn clear_all_reports_counts() {
    let store = seeded().await;
    let summary = store.clear_all().await.unwrap();
    assert_eq!(summary.sections, 2);
    assert_eq!(summary.entries, 3);
    assert_eq!(summary.overrides, 0);
    assert!(store.list_all().await.unwrap().is_empty());
}
