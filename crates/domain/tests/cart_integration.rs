//! End-to-end cart and order flows against the in-memory store.

use std::sync::Arc;

use common::{CustomerId, Money};
use domain::{
    LineManager, MockPaymentGateway, OrderError, OrderLifecycle, PaymentOutcome, PaymentRequest,
};
use store::{Game, GameRepository, MemoryStore, OrderStatus};

struct Fixture {
    store: Arc<MemoryStore>,
    lines: LineManager<MemoryStore>,
    lifecycle: OrderLifecycle<MemoryStore, MockPaymentGateway>,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let lines = LineManager::new(store.clone());
        let lifecycle = OrderLifecycle::new(store.clone(), Arc::new(MockPaymentGateway::new()));
        Self {
            store,
            lines,
            lifecycle,
        }
    }

    async fn seed_game(&self, key: &str, stock: u32) -> Game {
        let game = Game::new(key, key.to_uppercase(), Money::from_cents(1999), stock);
        self.store.insert_game(game.clone()).await.unwrap();
        game
    }

    async fn stock_of(&self, game: &Game) -> u32 {
        self.store
            .game(game.id)
            .await
            .unwrap()
            .unwrap()
            .unit_in_stock
    }
}

#[tokio::test]
async fn first_add_creates_a_single_unit_line() {
    let fx = Fixture::new();
    let game = fx.seed_game("hades", 5).await;
    let customer = CustomerId::new();

    let line = fx.lines.add_game_to_cart(customer, game.id).await.unwrap();

    assert_eq!(line.quantity, 1);
    assert_eq!(fx.stock_of(&game).await, 4);
}

#[tokio::test]
async fn repeat_add_merges_into_one_line() {
    let fx = Fixture::new();
    let game = fx.seed_game("hades", 5).await;
    let customer = CustomerId::new();

    fx.lines.add_game_to_cart(customer, game.id).await.unwrap();
    let line = fx.lines.add_game_to_cart(customer, game.id).await.unwrap();

    assert_eq!(line.quantity, 2);
    assert_eq!(fx.stock_of(&game).await, 3);
    assert_eq!(fx.store.line_count().await, 1);
}

#[tokio::test]
async fn zero_stock_add_is_rejected_and_nothing_changes() {
    let fx = Fixture::new();
    let game = fx.seed_game("spelunky", 0).await;
    let customer = CustomerId::new();

    let err = fx
        .lines
        .add_game_to_cart(customer, game.id)
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::Unavailable(_)));
    assert_eq!(fx.stock_of(&game).await, 0);
    assert!(fx.lines.carts().lines(customer).await.unwrap().is_empty());
}

#[tokio::test]
async fn soft_deleted_game_is_rejected() {
    let fx = Fixture::new();
    let mut game = Game::new("scrapped", "Scrapped", Money::from_cents(999), 10);
    game.is_deleted = true;
    fx.store.insert_game(game.clone()).await.unwrap();

    let err = fx
        .lines
        .add_game_to_cart(CustomerId::new(), game.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Unavailable(_)));
}

#[tokio::test]
async fn removing_a_missing_key_is_not_found() {
    let fx = Fixture::new();
    let game = fx.seed_game("hades", 5).await;
    let customer = CustomerId::new();
    fx.lines.add_game_to_cart(customer, game.id).await.unwrap();

    let err = fx
        .lines
        .remove_game_from_cart(customer, "missing-key")
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::GameNotFound(_)));
}

#[tokio::test]
async fn shipping_twice_is_an_invalid_operation() {
    let fx = Fixture::new();
    let game = fx.seed_game("hades", 5).await;
    let customer = CustomerId::new();
    let line = fx.lines.add_game_to_cart(customer, game.id).await.unwrap();

    let shipped = fx.lifecycle.ship_order(line.order_id).await.unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let err = fx.lifecycle.ship_order(line.order_id).await.unwrap_err();
    assert!(matches!(err, OrderError::AlreadyShipped(_)));
}

#[tokio::test]
async fn shipped_cart_lines_are_immutable() {
    let fx = Fixture::new();
    let game = fx.seed_game("hades", 5).await;
    let customer = CustomerId::new();
    let line = fx.lines.add_game_to_cart(customer, game.id).await.unwrap();

    fx.lifecycle.ship_order(line.order_id).await.unwrap();

    let err = fx.lines.update_line_quantity(line.id, 3).await.unwrap_err();
    assert!(matches!(err, OrderError::OrderNotOpen(_)));
    let err = fx.lines.delete_line(line.id).await.unwrap_err();
    assert!(matches!(err, OrderError::OrderNotOpen(_)));
}

#[tokio::test]
async fn units_are_conserved_across_a_mixed_sequence() {
    let fx = Fixture::new();
    let game = fx.seed_game("hades", 10).await;
    let a = CustomerId::new();
    let b = CustomerId::new();

    // a holds 3, b holds 2.
    let line_a = fx.lines.add_game_to_cart(a, game.id).await.unwrap();
    fx.lines.update_line_quantity(line_a.id, 3).await.unwrap();
    fx.lines.add_game_to_cart(b, game.id).await.unwrap();
    fx.lines.add_game_to_cart(b, game.id).await.unwrap();

    let reserved: u32 = {
        let mut sum = 0;
        for customer in [a, b] {
            sum += fx
                .lines
                .carts()
                .lines(customer)
                .await
                .unwrap()
                .iter()
                .map(|l| l.quantity)
                .sum::<u32>();
        }
        sum
    };
    assert_eq!(reserved, 5);
    assert_eq!(fx.stock_of(&game).await, 5);

    // b walks away; their units return.
    fx.lines.remove_game_from_cart(b, "hades").await.unwrap();
    assert_eq!(fx.stock_of(&game).await, 7);
}

#[tokio::test]
async fn one_open_order_per_customer_across_operations() {
    let fx = Fixture::new();
    let hades = fx.seed_game("hades", 5).await;
    let celeste = fx.seed_game("celeste", 5).await;
    let customer = CustomerId::new();

    let l1 = fx.lines.add_game_to_cart(customer, hades.id).await.unwrap();
    let l2 = fx.lines.add_game_to_cart(customer, celeste.id).await.unwrap();

    assert_eq!(l1.order_id, l2.order_id);
    assert_eq!(fx.store.open_order_count(customer).await, 1);

    // Shipping frees the slot; the next add opens a fresh cart.
    fx.lifecycle.ship_order(l1.order_id).await.unwrap();
    let l3 = fx.lines.add_game_to_cart(customer, hades.id).await.unwrap();
    assert_ne!(l3.order_id, l1.order_id);
    assert_eq!(fx.store.open_order_count(customer).await, 1);
}

#[tokio::test]
async fn checkout_flow_pays_then_ships() {
    let fx = Fixture::new();
    let game = fx.seed_game("hades", 5).await;
    let customer = CustomerId::new();

    let line = fx.lines.add_game_to_cart(customer, game.id).await.unwrap();
    fx.lines.update_line_quantity(line.id, 2).await.unwrap();

    let outcome = fx
        .lifecycle
        .process_payment(PaymentRequest {
            customer_id: customer,
            method: "visa".to_string(),
        })
        .await
        .unwrap();
    match outcome {
        PaymentOutcome::Confirmation(c) => {
            assert_eq!(c.order_id, line.order_id);
            assert_eq!(c.amount.cents(), 3998);
        }
        PaymentOutcome::Invoice { .. } => panic!("expected confirmation"),
    }

    // Payment does not touch the ledger.
    assert_eq!(fx.stock_of(&game).await, 3);

    let shipped = fx.lifecycle.ship_order(line.order_id).await.unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let details = fx.lifecycle.order_details(line.order_id).await.unwrap();
    assert_eq!(details.total.cents(), 3998);
    assert_eq!(details.lines.len(), 1);
}
