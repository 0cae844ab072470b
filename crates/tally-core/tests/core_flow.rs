use chrono::NaiveDate;
use tally_core::analytics;
use tally_core::store::Store;
use tally_core::task::order_for_display;
use tempfile::tempdir;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

#[test]
fn mutation_sequence_round_trips_through_reopen() {
    let temp = tempdir().expect("tempdir");

    let (rent_id, report_id) = {
        let mut store = Store::open(temp.path()).expect("open store");
        store.add_category("home").expect("add category");
        store.add_category("work").expect("add category");

        let rent_id = store
            .add_task("Pay rent", Some(date("2026-09-01")), vec!["home".to_string()])
            .expect("add task");
        let report_id = store
            .add_task("Ship report", None, vec!["work".to_string()])
            .expect("add task");
        store
            .add_task("Scratch note", None, vec![])
            .and_then(|id| store.delete_task(id))
            .expect("add then delete");

        store.toggle_complete(rent_id).expect("complete rent");
        store
            .edit_task(
                report_id,
                "Ship quarterly report",
                Some(date("2026-08-20")),
                vec!["work".to_string(), "home".to_string()],
            )
            .expect("edit report");

        (rent_id, report_id)
    };

    let store = Store::open(temp.path()).expect("reopen store");

    assert_eq!(store.categories(), ["home".to_string(), "work".to_string()]);
    assert_eq!(store.tasks().len(), 2);

    let rent = store.task(rent_id).expect("rent survives");
    assert_eq!(rent.text, "Pay rent");
    assert_eq!(rent.due, Some(date("2026-09-01")));
    assert!(rent.completed);

    let report = store.task(report_id).expect("report survives");
    assert_eq!(report.text, "Ship quarterly report");
    assert_eq!(report.due, Some(date("2026-08-20")));
    assert_eq!(
        report.categories,
        vec!["work".to_string(), "home".to_string()]
    );
    assert!(!report.completed);
}

#[test]
fn cascade_delete_then_analytics_reflect_survivors() {
    let temp = tempdir().expect("tempdir");
    let mut store = Store::open(temp.path()).expect("open store");
    store.add_category("errands").expect("add category");
    store.add_category("deep-work").expect("add category");

    let groceries = store
        .add_task("Buy groceries", Some(date("2026-08-10")), vec!["errands".to_string()])
        .expect("add task");
    store
        .add_task("Refactor parser", None, vec!["deep-work".to_string()])
        .expect("add task");
    let review = store
        .add_task("Review draft", None, vec!["deep-work".to_string()])
        .expect("add task");

    store.toggle_complete(groceries).expect("complete groceries");
    store.toggle_complete(review).expect("complete review");

    let index = store.category_index("errands").expect("resolve errands");
    let (_, removed) = store.delete_category(index).expect("delete errands");
    assert_eq!(removed, 1);

    let reopened = Store::open(temp.path()).expect("reopen store");
    assert_eq!(reopened.categories(), ["deep-work".to_string()]);
    assert_eq!(reopened.tasks().len(), 2);

    assert_eq!(analytics::overall_rate(reopened.tasks()), 50.0);
    let rates = analytics::category_rates(reopened.tasks(), reopened.categories());
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0].rate, 50.0);

    // Display order puts the open task first, completed last.
    let ordered = order_for_display(reopened.tasks());
    assert!(!ordered[0].completed);
    assert!(ordered[1].completed);
}
