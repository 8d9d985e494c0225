use engine::{Category, EngineError, ExpenseFilter, ExpenseInput, ExpenseStats, Money, YearMonth};

mod common;
use common::{date, engine_on, expense, insert_user, long_ago, money};

#[tokio::test]
async fn create_validates_input() {
    let (engine, _db, _channel) = engine_on(date(2026, 3, 15)).await;

    let blank = expense("   ", "10", Category::Food, date(2026, 3, 1));
    let err = engine.create_expense("alice", blank).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let mut zero = expense("Water", "10", Category::Food, date(2026, 3, 1));
    zero.amount = Some(Money::ZERO);
    let err = engine.create_expense("alice", zero).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let missing = ExpenseInput {
        description: "Bus".to_string(),
        amount: Some(money("2")),
        ..Default::default()
    };
    let err = engine.create_expense("alice", missing).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_expense("ghost", expense("Tea", "1", Category::Food, date(2026, 3, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn expenses_are_private_to_their_owner() {
    let (engine, db, _channel) = engine_on(date(2026, 3, 15)).await;
    insert_user(&db, "bob", long_ago()).await;

    let mut input = expense("  Pizza  ", "12,50", Category::Food, date(2026, 3, 1));
    input.notes = Some("   ".to_string());
    let pizza = engine.create_expense("alice", input).await.unwrap();
    assert_eq!(pizza.description, "Pizza");
    assert_eq!(pizza.amount, money("12.50"));
    assert_eq!(pizza.notes, None);

    let err = engine.expense(pizza.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
    let err = engine
        .update_expense(
            pizza.id,
            "bob",
            expense("Pizza", "1", Category::Food, date(2026, 3, 1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
    let err = engine.delete_expense(pizza.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
    let err = engine.delete_expense(4242, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    assert_eq!(engine.expense(pizza.id, "alice").await.unwrap(), pizza);
}

#[tokio::test]
async fn listing_filters_and_orders_newest_first() {
    let (engine, _db, _channel) = engine_on(date(2026, 3, 15)).await;
    let feb = engine
        .create_expense(
            "alice",
            expense("Old", "5", Category::Food, date(2026, 2, 20)),
        )
        .await
        .unwrap();
    let first = engine
        .create_expense("alice", expense("A", "5", Category::Food, date(2026, 3, 2)))
        .await
        .unwrap();
    let second = engine
        .create_expense(
            "alice",
            expense("B", "5", Category::Travel, date(2026, 3, 2)),
        )
        .await
        .unwrap();
    let last = engine
        .create_expense("alice", expense("C", "5", Category::Food, date(2026, 3, 9)))
        .await
        .unwrap();

    let ids = |list: Vec<engine::Expense>| {
        list.into_iter().map(|e| e.id).collect::<Vec<_>>()
    };

    let march = YearMonth::new(2026, 3).unwrap();
    assert_eq!(
        ids(engine.expenses_in_month("alice", march).await.unwrap()),
        vec![last.id, second.id, first.id]
    );

    let all = engine
        .list_expenses("alice", &ExpenseFilter::default())
        .await
        .unwrap();
    assert_eq!(ids(all).last(), Some(&feb.id));

    let food = ExpenseFilter {
        category: Some(Category::Food),
        limit: Some(2),
        ..ExpenseFilter::month(march)
    };
    assert_eq!(
        ids(engine.list_expenses("alice", &food).await.unwrap()),
        vec![last.id, first.id]
    );

    let inverted = ExpenseFilter {
        from: Some(date(2026, 3, 9)),
        to: Some(date(2026, 3, 1)),
        ..ExpenseFilter::default()
    };
    let err = engine.list_expenses("alice", &inverted).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn monthly_projections() {
    let (engine, _db, _channel) = engine_on(date(2026, 3, 15)).await;
    let march = YearMonth::new(2026, 3).unwrap();
    for (description, amount, category, day) in [
        ("Lunch", "10", Category::Food, date(2026, 3, 1)),
        ("Dinner", "20", Category::Food, date(2026, 3, 1)),
        ("Taxi", "15", Category::Travel, date(2026, 3, 3)),
        ("Rent", "700", Category::Rent, date(2026, 2, 1)),
        ("Ancient", "1", Category::Other, date(2025, 3, 31)),
    ] {
        engine
            .create_expense("alice", expense(description, amount, category, day))
            .await
            .unwrap();
    }

    assert_eq!(
        engine.monthly_total("alice", march).await.unwrap(),
        money("45")
    );

    let by_category = engine.category_spending("alice", march).await.unwrap();
    assert_eq!(by_category.len(), 2);
    assert_eq!(by_category[&Category::Food], money("30"));
    assert_eq!(by_category[&Category::Travel], money("15"));

    let daily = engine.daily_breakdown("alice").await.unwrap();
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[&1], money("30"));
    assert_eq!(daily[&3], money("15"));

    let trend = engine.monthly_trend("alice").await.unwrap();
    assert_eq!(trend.len(), 12);
    assert_eq!(trend.keys().next().map(String::as_str), Some("2025-04"));
    assert_eq!(trend["2026-03"], money("45"));
    assert_eq!(trend["2026-02"], money("700"));
    assert_eq!(trend["2025-10"], Money::ZERO);

    let top = engine.top_expenses("alice", None, 2).await.unwrap();
    let names: Vec<&str> = top.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(names, vec!["Rent", "Dinner"]);

    assert_eq!(engine.expense_count("alice").await.unwrap(), 5);
}

#[tokio::test]
async fn top_expenses_keep_insertion_order_on_ties() {
    let (engine, _db, _channel) = engine_on(date(2026, 3, 15)).await;
    let mut ids = Vec::new();
    for name in ["first", "second", "third"] {
        let e = engine
            .create_expense(
                "alice",
                expense(name, "9.99", Category::Shopping, date(2026, 3, 5)),
            )
            .await
            .unwrap();
        ids.push(e.id);
    }
    let march = YearMonth::new(2026, 3).unwrap();
    let top: Vec<i64> = engine
        .top_expenses("alice", Some(march), 10)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(top, ids);
}

#[tokio::test]
async fn streak_counts_back_from_today() {
    let (engine, _db, _channel) = engine_on(date(2026, 3, 15)).await;
    assert_eq!(engine.current_streak("alice").await.unwrap(), 0);

    for day in [15, 14, 13, 11] {
        engine
            .create_expense(
                "alice",
                expense("Coffee", "2", Category::Food, date(2026, 3, day)),
            )
            .await
            .unwrap();
    }
    assert_eq!(engine.current_streak("alice").await.unwrap(), 3);
    assert_eq!(
        engine
            .distinct_expense_days("alice", date(2026, 3, 9), date(2026, 3, 15))
            .await
            .unwrap(),
        4
    );
}

#[tokio::test]
async fn search_matches_description_ignoring_case() {
    let (engine, _db, _channel) = engine_on(date(2026, 3, 15)).await;
    for (description, day) in [
        ("Coffee beans", 3),
        ("Iced COFFEE", 7),
        ("Tea", 8),
        ("100% juice", 9),
    ] {
        engine
            .create_expense(
                "alice",
                expense(description, "4", Category::Groceries, date(2026, 3, day)),
            )
            .await
            .unwrap();
    }

    let search = |keyword: &str| ExpenseFilter {
        search: Some(keyword.to_string()),
        ..ExpenseFilter::default()
    };
    let names = |list: Vec<engine::Expense>| {
        list.into_iter().map(|e| e.description).collect::<Vec<_>>()
    };

    let found = engine
        .list_expenses("alice", &search("coffee"))
        .await
        .unwrap();
    assert_eq!(names(found), vec!["Iced COFFEE", "Coffee beans"]);

    let found = engine.list_expenses("alice", &search("0%")).await.unwrap();
    assert_eq!(names(found), vec!["100% juice"]);
    assert!(engine
        .list_expenses("alice", &search("_"))
        .await
        .unwrap()
        .is_empty());

    let everything = engine.list_expenses("alice", &search("  ")).await.unwrap();
    assert_eq!(everything.len(), 4);
}

#[tokio::test]
async fn recent_expenses_cover_the_last_days() {
    let (engine, _db, _channel) = engine_on(date(2026, 3, 15)).await;
    for day in [1, 8, 14] {
        engine
            .create_expense(
                "alice",
                expense("Snack", "1", Category::Food, date(2026, 3, day)),
            )
            .await
            .unwrap();
    }

    let dates: Vec<_> = engine
        .recent_expenses("alice", 7)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.date)
        .collect();
    assert_eq!(dates, vec![date(2026, 3, 14), date(2026, 3, 8)]);
    assert_eq!(engine.recent_expenses("alice", 0).await.unwrap().len(), 0);
}

#[tokio::test]
async fn expense_stats_summarise_usage() {
    let (engine, _db, _channel) = engine_on(date(2026, 3, 15)).await;
    let march = YearMonth::new(2026, 3).unwrap();

    let empty = engine.expense_stats("alice").await.unwrap();
    assert_eq!(
        empty,
        ExpenseStats {
            total_count: 0,
            current_month_count: 0,
            total_amount: Money::ZERO,
            current_month_total: Money::ZERO,
            average_daily: Money::ZERO,
            top_category: None,
        }
    );

    for (description, amount, category, day) in [
        ("Lunch", "10", Category::Food, date(2026, 3, 1)),
        ("Dinner", "20", Category::Food, date(2026, 3, 1)),
        ("Cinema", "12", Category::Entertainment, date(2026, 3, 4)),
        ("Bus", "3", Category::Travel, date(2026, 3, 5)),
        ("Flight", "300", Category::Travel, date(2026, 2, 10)),
    ] {
        engine
            .create_expense("alice", expense(description, amount, category, day))
            .await
            .unwrap();
    }

    let usage = engine.category_usage("alice").await.unwrap();
    assert_eq!(usage[&Category::Food], 2);
    assert_eq!(usage[&Category::Travel], 2);
    assert_eq!(usage[&Category::Entertainment], 1);
    assert!(!usage.contains_key(&Category::Rent));

    let top = engine
        .top_spending_categories("alice", march, 2)
        .await
        .unwrap();
    assert_eq!(
        top,
        vec![
            (Category::Food, money("30")),
            (Category::Entertainment, money("12")),
        ]
    );

    // 45 over three days with expenses.
    assert_eq!(
        engine.average_daily_spending("alice", march).await.unwrap(),
        money("15")
    );

    let stats = engine.expense_stats("alice").await.unwrap();
    assert_eq!(stats.total_count, 5);
    assert_eq!(stats.current_month_count, 4);
    assert_eq!(stats.total_amount, money("345"));
    assert_eq!(stats.current_month_total, money("45"));
    assert_eq!(stats.average_daily, money("15"));
    assert_eq!(stats.top_category, Some(Category::Food));
}

#[tokio::test]
async fn empty_months_total_zero() {
    let (engine, _db, _channel) = engine_on(date(2026, 3, 15)).await;
    let march = YearMonth::new(2026, 3).unwrap();
    assert_eq!(
        engine.monthly_total("alice", march).await.unwrap(),
        Money::ZERO
    );
    assert_eq!(
        engine
            .distinct_expense_days("alice", date(2026, 3, 1), date(2026, 3, 31))
            .await
            .unwrap(),
        0
    );
    assert_eq!(engine.total_points("alice").await.unwrap(), 0);
    assert_eq!(engine.user_rank("alice").await.unwrap(), 1);
}
