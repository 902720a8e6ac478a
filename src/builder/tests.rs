#![cfg(test)]
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::builder::{PaymentMethod, PrivateUserResolver, Step, TransactionBuilder};
use crate::error::{TxError, WalletError};
use crate::gateway::{GatewayCall, MockGateway, WalletProvider};

// =========================================================================
// Helpers
// =========================================================================

fn fixed_clock() -> String {
    "1/1/2025, 10:00:00".to_string()
}

fn builder_at(method: PaymentMethod) -> TransactionBuilder {
    let mut b = TransactionBuilder::default().with_clock(fixed_clock);
    b.set_recipient("0xShop").unwrap();
    b.submit_recipient(&PrivateUserResolver).unwrap();
    b.choose(method).unwrap();
    b
}

fn tenths(n: i64) -> Decimal {
    Decimal::new(n, 1)
}

// =========================================================================
// Recipient step
// =========================================================================

#[test]
fn empty_recipient_does_not_advance() {
    let mut b = TransactionBuilder::default();
    b.set_recipient("   ").unwrap();

    assert_eq!(
        b.submit_recipient(&PrivateUserResolver).unwrap_err(),
        TxError::EmptyRecipient
    );
    assert!(b.resolved().is_none());
    assert_eq!(b.choose(PaymentMethod::Manual), Err(TxError::NotReady(Step::Recipient)));
}

#[test]
fn resolving_locks_recipient_until_back() {
    let mut b = TransactionBuilder::default();
    b.set_recipient("0xAB").unwrap();

    let resolved = b.submit_recipient(&PrivateUserResolver).unwrap().clone();
    assert_eq!(resolved.address, "0xAB");
    assert_eq!(resolved.display_name, "Usuario Privado");
    assert!(b.set_recipient("0xCD").is_err());

    b.back();
    assert!(b.set_recipient("0xCD").is_ok());
}

#[test]
fn back_clears_payment_state() {
    let mut b = builder_at(PaymentMethod::Catalog);
    b.toggle_product("Cerveza").unwrap();

    b.back();

    assert_eq!(b.step(), Step::Recipient);
    assert!(b.resolved().is_none());
    assert!(b.selected().is_empty());
    assert_eq!(b.total(), Decimal::ZERO);
    assert_eq!(b.amount(), "");
    assert_eq!(b.recipient(), "0xShop");
}

// =========================================================================
// Catalog step
// =========================================================================

#[test]
fn catalog_toggle_scenario() {
    let mut b = builder_at(PaymentMethod::Catalog);

    b.toggle_product("Refresco").unwrap(); // 0.5
    b.toggle_product("Arroz").unwrap(); // 1.2
    let total = b.toggle_product("Refresco").unwrap();

    assert_eq!(total, tenths(12));
    assert_eq!(b.selected(), &["Arroz".to_string()]);
}

#[test]
fn catalog_total_always_matches_selection() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut b = builder_at(PaymentMethod::Catalog);
    let names: Vec<String> = b.catalog().products().iter().map(|p| p.name.clone()).collect();

    for _ in 0..500 {
        let pick = &names[rng.gen_range(0..names.len())];
        b.toggle_product(pick).unwrap();

        let expected: Decimal = b
            .selected()
            .iter()
            .filter_map(|n| b.catalog().find(n))
            .map(|p| p.price)
            .sum();
        assert_eq!(b.total(), expected);
    }
}

#[test]
fn unknown_product_is_rejected() {
    let mut b = builder_at(PaymentMethod::Catalog);
    assert_eq!(
        b.toggle_product("Caviar"),
        Err(TxError::UnknownProduct("Caviar".into()))
    );
    assert_eq!(b.total(), Decimal::ZERO);
}

#[test]
fn zero_total_blocks_submission() {
    let mut b = builder_at(PaymentMethod::Catalog);
    assert!(!b.can_submit());

    b.toggle_product("Sal").unwrap();
    assert!(b.can_submit());

    b.toggle_product("Sal").unwrap();
    assert_eq!(b.prepare(), Err(TxError::ZeroAmount));
}

// =========================================================================
// Manual step
// =========================================================================

#[test]
fn presets_fill_the_amount() {
    let mut b = builder_at(PaymentMethod::Manual);

    b.pick_preset("3").unwrap();
    assert_eq!(b.amount(), "3");
    assert!(b.pick_preset("9").is_err());

    let intent = b.prepare().unwrap();
    assert_eq!(intent.amount, "3");
    assert_eq!(intent.amount_wei, 3_000_000_000_000_000_000);
}

#[test]
fn manual_amount_is_validated() {
    let mut b = builder_at(PaymentMethod::Manual);

    b.set_amount("0").unwrap();
    assert_eq!(b.prepare(), Err(TxError::ZeroAmount));

    b.set_amount("lots").unwrap();
    assert!(matches!(b.prepare(), Err(TxError::InvalidAmount(_))));
}

// =========================================================================
// Submission
// =========================================================================

#[tokio::test]
async fn manual_submit_returns_record_and_resets() {
    let gw = MockGateway::new();
    let mut b = builder_at(PaymentMethod::Manual);
    b.set_amount("2").unwrap();

    let record = b
        .submit(Some(&gw as &dyn WalletProvider), &gw)
        .await
        .unwrap();

    assert_eq!(record.recipient, "0xShop");
    assert_eq!(record.amount, "2");
    assert_eq!(record.date, "1/1/2025, 10:00:00");
    assert_eq!(record.hash, "0xhash2");
    assert_eq!(b.step(), Step::Recipient);
    assert_eq!(b.recipient(), "");

    assert_eq!(
        gw.calls()[1],
        GatewayCall::Send {
            to: "0xShop".into(),
            from: "0xmerchant".into(),
            value_wei: 2_000_000_000_000_000_000,
        }
    );
}

#[tokio::test]
async fn catalog_submit_goes_through_contract() {
    let gw = MockGateway::new();
    let mut b = builder_at(PaymentMethod::Catalog);
    b.toggle_product("Leche").unwrap();
    b.toggle_product("Pan").unwrap();

    let record = b.submit(Some(&gw), &gw).await.unwrap();

    assert_eq!(record.amount, "1");
    assert!(matches!(
        gw.calls()[1],
        GatewayCall::Contract { amount_wei: 1_000_000_000_000_000_000, .. }
    ));
}

#[tokio::test]
async fn rejected_signature_preserves_state() {
    let gw = MockGateway::new();
    gw.push_outcome(Err(WalletError::UserRejected));
    let mut b = builder_at(PaymentMethod::Manual);
    b.set_amount("5").unwrap();

    let err = b.submit(Some(&gw), &gw).await.unwrap_err();

    assert_eq!(err, TxError::UserRejected);
    assert_eq!(b.step(), Step::Manual);
    assert_eq!(b.amount(), "5");
    assert_eq!(b.recipient(), "0xShop");

    // retry succeeds
    assert!(b.submit(Some(&gw), &gw).await.is_ok());
}

#[tokio::test]
async fn missing_wallet_is_reported_first() {
    let gw = MockGateway::new();
    let mut b = builder_at(PaymentMethod::Manual);
    b.set_amount("1").unwrap();

    let err = b.submit(None, &gw).await.unwrap_err();

    assert_eq!(err, TxError::WalletUnavailable);
    assert!(gw.calls().is_empty());
    assert_eq!(b.step(), Step::Manual);
}

#[tokio::test]
async fn validation_happens_before_any_call() {
    let gw = MockGateway::new();
    let mut b = builder_at(PaymentMethod::Catalog);

    let err = b.submit(Some(&gw), &gw).await.unwrap_err();

    assert_eq!(err, TxError::ZeroAmount);
    assert!(err.is_validation());
    assert!(gw.calls().is_empty());
}
