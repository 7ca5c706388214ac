//! Checkout, plan change and portal flows end to end

use subkeeper_billing::checkout::{ALREADY_SUBSCRIBED, SAME_SUBSCRIPTION};
use subkeeper_billing::{AckStatus, BillingError, SubscriptionStatus, UpdateDecision};

use crate::common::{checkout_completed_payload, sign, FakeStripe};

#[tokio::test]
async fn test_concurrent_checkouts_converge_to_one_subscription() {
    let stripe = FakeStripe::new();
    stripe.add_customer("cus_1", None);
    let billing = stripe.service();

    // Both pass the policy check before either completes
    let (first, second) = tokio::join!(
        billing.checkout.start_subscription("cus_1", "price_pro"),
        billing.checkout.start_subscription("cus_1", "price_pro"),
    );
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(stripe.checkout_requests().len(), 2);

    // Customer pays both sessions
    stripe.add_subscription("sub_a", "cus_1", "price_pro", 1_000, SubscriptionStatus::Active);
    stripe.add_subscription("sub_b", "cus_1", "price_pro", 1_001, SubscriptionStatus::Active);

    for event_id in ["evt_a", "evt_b"] {
        let payload = checkout_completed_payload(event_id, "cus_1");
        let ack = billing
            .webhooks
            .handle_webhook(&payload, &sign(&payload))
            .await
            .unwrap();
        assert_eq!(ack.status, AckStatus::Success);
    }

    assert_eq!(stripe.active_subscription_ids("cus_1"), vec!["sub_b".to_string()]);
}

#[tokio::test]
async fn test_start_rejected_once_subscribed() {
    let stripe = FakeStripe::new();
    stripe.add_customer("cus_1", None);
    stripe.add_subscription("sub_1", "cus_1", "price_pro", 1_000, SubscriptionStatus::Active);
    let billing = stripe.service();

    let err = billing
        .checkout
        .start_subscription("cus_1", "price_team")
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::BadRequest(msg) if msg == ALREADY_SUBSCRIBED));
    assert!(stripe.checkout_requests().is_empty());
}

#[tokio::test]
async fn test_start_allowed_after_previous_subscription_cancelled() {
    let stripe = FakeStripe::new();
    stripe.add_customer("cus_1", None);
    stripe.add_subscription("sub_1", "cus_1", "price_pro", 1_000, SubscriptionStatus::Inactive);
    let billing = stripe.service();

    let session_id = billing
        .checkout
        .start_subscription("cus_1", "price_pro")
        .await
        .unwrap();

    assert!(session_id.starts_with("cs_"));
    let requests = stripe.checkout_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].success_url, "http://localhost:3000/subscription/success");
    assert_eq!(requests[0].cancel_url, "http://localhost:3000/subscription/cancel");
}

#[tokio::test]
async fn test_plan_change_replaces_old_subscription() {
    let stripe = FakeStripe::new();
    stripe.add_customer("cus_1", None);
    stripe.add_subscription("sub_pro", "cus_1", "price_pro", 1_000, SubscriptionStatus::Active);
    let billing = stripe.service();

    billing
        .checkout
        .change_subscription("cus_1", "price_team")
        .await
        .unwrap();
    // Nothing is cancelled until the new subscription exists
    assert!(stripe.mutations().is_empty());

    stripe.add_subscription("sub_team", "cus_1", "price_team", 2_000, SubscriptionStatus::Active);
    let payload = checkout_completed_payload("evt_change", "cus_1");
    billing
        .webhooks
        .handle_webhook(&payload, &sign(&payload))
        .await
        .unwrap();

    assert_eq!(stripe.active_subscription_ids("cus_1"), vec!["sub_team".to_string()]);

    let decision = billing
        .policy
        .can_update_subscription("cus_1", "price_team")
        .await
        .unwrap();
    assert_eq!(decision, UpdateDecision::SameSubscription);

    let err = billing
        .checkout
        .change_subscription("cus_1", "price_team")
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::BadRequest(msg) if msg == SAME_SUBSCRIPTION));
}

#[tokio::test]
async fn test_portal_link_for_known_customer() {
    let stripe = FakeStripe::new();
    stripe.add_customer("cus_1", None);
    let billing = stripe.service();

    let url = billing.portal.open_billing_portal("cus_1").await.unwrap();
    assert_eq!(url, "https://billing.stripe.com/p/session/cus_1");

    let err = billing
        .portal
        .open_billing_portal("cus_missing")
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::GatewayRejected(_)));
}

#[tokio::test]
async fn test_created_customer_can_subscribe() {
    let stripe = FakeStripe::new();
    let billing = stripe.service();

    let customer = billing
        .customer
        .create_customer("new@example.com")
        .await
        .unwrap();
    assert_eq!(customer.email.as_deref(), Some("new@example.com"));

    let fetched = billing.customer.get_customer(&customer.id).await.unwrap();
    assert_eq!(fetched.id, customer.id);

    billing
        .checkout
        .start_subscription(&customer.id, "price_pro")
        .await
        .unwrap();
    assert_eq!(stripe.checkout_requests()[0].customer_id, customer.id);
}
