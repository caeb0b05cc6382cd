//! Integration tests for the three checkout steps, the summary panel and
//! coupons.

use reqwest::StatusCode;
use vitrine_integration_tests::{STORE, TestContext, location, valid_shipping_form};

fn with(overrides: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
    let mut form: Vec<_> = valid_shipping_form()
        .into_iter()
        .filter(|(name, _)| !overrides.iter().any(|(o, _)| o == name))
        .collect();
    form.extend_from_slice(overrides);
    form
}

#[tokio::test]
async fn test_empty_cart_redirects_to_cart() {
    let ctx = TestContext::new().await;
    let resp = ctx.get("/checkout").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("/{STORE}/cart"));

    let body = ctx.get_text("/cart").await;
    assert!(body.contains(r#"<div class="flash" role="status">Your cart is empty.</div>"#));
}

#[tokio::test]
async fn test_shipping_step_form() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 2).await;

    let body = ctx.get_text("/checkout").await;
    assert!(body.contains(r#"aria-current="step""#));
    assert!(body.contains(r#"name="email""#));
    assert!(body.contains(r#"data-cascade-target="state_id""#));
    assert!(body.contains(r#"data-cascade-reset="city_id""#));
    assert!(body.contains(r#"data-cascade-target="billing_state_id""#));
    assert!(body.contains("Kenya"));
    assert!(body.contains("Standard"));
    // No method chosen yet
    assert!(body.contains("Select a method"));
    assert!(body.contains("$40.00"));
}

#[tokio::test]
async fn test_shipping_validation_rerenders_with_input() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 1).await;

    let resp = ctx
        .post_form(
            "/checkout/shipping",
            &[("email", "not-an-email"), ("first_name", "Ada")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = resp.text().await.unwrap();
    assert!(body.contains("Please enter a valid email address."));
    assert!(body.contains("Last name is required."));
    assert!(body.contains("Country is required."));
    assert!(body.contains("Please choose a shipping method."));
    assert!(body.contains(r#"value="not-an-email""#));
    assert!(body.contains(r#"value="Ada""#));
    assert!(!body.contains("First name is required."));

    // The rejected input survives a reload
    let body = ctx.get_text("/checkout").await;
    assert!(body.contains(r#"value="not-an-email""#));
}

#[tokio::test]
async fn test_location_outside_parent_is_dropped() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 1).await;

    // Nairobi County belongs to Kenya, not Ghana
    let resp = ctx
        .post_form("/checkout/shipping", &with(&[("country_id", "2")]))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = resp.text().await.unwrap();
    assert!(body.contains("State is required."));
    assert!(body.contains("City is required."));
    assert!(!body.contains("Country is required."));
}

#[tokio::test]
async fn test_separate_billing_address_is_validated() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 1).await;

    let resp = ctx
        .post_form("/checkout/shipping", &with(&[("billing_different", "1")]))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = resp.text().await.unwrap();
    assert!(body.contains(r#"id="billing_first_name-error""#));
    assert!(body.contains(r#"id="billing_different" name="billing_different" value="1" data-toggle="billing-address" checked"#));

    let resp = ctx
        .post_form(
            "/checkout/shipping",
            &with(&[
                ("billing_different", "1"),
                ("billing_first_name", "Charles"),
                ("billing_last_name", "Babbage"),
                ("billing_address", "1 Dorset St"),
                ("billing_postal_code", "00200"),
                ("billing_country_id", "1"),
                ("billing_state_id", "11"),
                ("billing_city_id", "110"),
            ]),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = ctx.get_text("/checkout").await;
    assert!(body.contains("Charles Babbage"));
    assert!(body.contains("1 Dorset St, Mombasa, Mombasa County, 00200, Kenya"));
}

#[tokio::test]
async fn test_review_step_shows_details_and_totals() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 2).await;
    ctx.submit_valid_shipping().await;

    let body = ctx.get_text("/checkout").await;
    assert!(body.contains("Ada Lovelace"));
    assert!(body.contains("12 Moi Avenue, Nairobi, Nairobi County, 00100, Kenya"));
    assert!(body.contains("Same as shipping address"));
    assert!(body.contains("Continue to payment"));
    // 40.00 + 10.00 flat rate
    assert!(body.contains("$10.00"));
    assert!(body.contains("$50.00"));
}

#[tokio::test]
async fn test_steps_cannot_be_skipped() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 1).await;

    let resp = ctx.post_form("/checkout/review", &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let form = reqwest::multipart::Form::new()
        .text("payment_method", "cod")
        .text("terms", "1");
    let resp = ctx
        .client
        .post(ctx.store_url("/checkout/place"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    // Still on the shipping step
    let body = ctx.get_text("/checkout").await;
    assert!(body.contains("Continue to review"));
}

#[tokio::test]
async fn test_back_keeps_details() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 1).await;
    ctx.submit_valid_shipping().await;

    let resp = ctx.post_form("/checkout/back", &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = ctx.get_text("/checkout").await;
    assert!(body.contains("Continue to review"));
    assert!(body.contains(r#"value="Lovelace""#));
    // Saved selections come back with their option lists
    assert!(body.contains(r#"<option value="10" selected>Nairobi County</option>"#));
    assert!(body.contains(r#"<option value="100" selected>Nairobi</option>"#));
}

#[tokio::test]
async fn test_change_shipping_method_from_summary() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 2).await;
    ctx.submit_valid_shipping().await;

    let resp = ctx
        .post_form("/checkout/shipping-method", &[("shipping_method_id", "2")])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = ctx.get_text("/checkout").await;
    assert!(body.contains("Add $60.00 more for free shipping"));

    let resp = ctx
        .post_form("/checkout/shipping-method", &[("shipping_method_id", "5")])
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.unwrap().contains("Please choose a shipping method."));
}

#[tokio::test]
async fn test_apply_and_remove_coupon() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 2).await;
    ctx.submit_valid_shipping().await;

    let resp = ctx.post_form("/checkout/coupon", &[("code", " SAVE10 ")]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    {
        let requests = ctx.recorder.coupon_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["code"], "SAVE10");
        assert_eq!(requests[0]["store_id"], 7);
        assert_eq!(requests[0]["shipping_method_id"], 1);
    }

    let body = ctx.get_text("/checkout").await;
    assert!(body.contains("-$10.00"));
    assert!(body.contains("<strong>SAVE10</strong>"));
    // 40.00 - 10.00 + 10.00
    assert!(body.contains(r#"<dd class="summary-total">$40.00</dd>"#));

    // A second coupon is refused without asking the backend
    let resp = ctx.post_form("/checkout/coupon", &[("code", "SAVE10")]).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.recorder.coupon_requests.lock().unwrap().len(), 1);

    let resp = ctx.post_form("/checkout/coupon/remove", &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = ctx.get_text("/checkout").await;
    assert!(!body.contains("-$10.00"));
    assert!(body.contains(r#"<dd class="summary-total">$50.00</dd>"#));
}

#[tokio::test]
async fn test_rejected_coupon_shows_backend_message() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 1).await;

    let resp = ctx.post_form("/checkout/coupon", &[("code", "BOGUS")]).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.unwrap().contains("This coupon has expired."));

    // Blank codes never reach the backend
    let resp = ctx.post_form("/checkout/coupon", &[("code", "   ")]).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.recorder.coupon_requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cart_change_drops_coupon_and_restarts_checkout() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("mug", 2).await;
    ctx.submit_valid_shipping().await;
    let resp = ctx.post_form("/checkout/coupon", &[("code", "SAVE10")]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let resp = ctx.post_form("/checkout/review", &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = ctx
        .post_form("/cart/update", &[("line_id", "1"), ("quantity", "1")])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = ctx.get_text("/checkout").await;
    assert!(body.contains("Continue to review"));
    assert!(body.contains(r#"value="Lovelace""#));
    assert!(!body.contains("<strong>SAVE10</strong>"));
    assert!(!body.contains("-$10.00"));
    // 20.00 + 10.00 flat rate, no discount
    assert!(body.contains(r#"<dd class="summary-total">$30.00</dd>"#));
}
