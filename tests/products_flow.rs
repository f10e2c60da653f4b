mod common;

use axum_marketplace_api::{
    dto::{
        cart::{AddToCartRequest, UpdateCartItemRequest},
        products::{CreateProductRequest, UpdateProductRequest},
    },
    error::AppError,
    middleware::auth::Role,
    routes::params::Pagination,
    services::{cart_service, product_service},
};
use common::{create_product, create_user, product_stock, setup_state, test_database_url};
use uuid::Uuid;

fn page(page: i64, per_page: i64) -> Pagination {
    Pagination {
        page: Some(page),
        per_page: Some(per_page),
    }
}

// Vendors browse their own inventory, customers the purchasable catalog.
#[tokio::test]
async fn catalog_is_filtered_by_role() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let vendor_a = create_user(&state, "vera", Role::Vendor).await?;
    let vendor_b = create_user(&state, "nils", Role::Vendor).await?;
    let customer = create_user(&state, "tom", Role::Customer).await?;

    let candle = create_product(&state, &vendor_a, "Catalog Candle", 700, 6).await?;
    let stool = create_product(&state, &vendor_a, "Catalog Stool", 900, 0).await?;
    let basket = create_product(&state, &vendor_b, "Catalog Basket", 400, 3).await?;

    // Vendor list: own rows only, sold-out included.
    let response = product_service::list_products(&state, &vendor_a, page(1, 100)).await?;
    assert_eq!(response.meta.expect("meta").total, Some(2));
    let mine = response.data.expect("products").items;
    let mine_ids: Vec<Uuid> = mine.iter().map(|p| p.id).collect();
    assert!(mine_ids.contains(&candle.id));
    assert!(mine_ids.contains(&stool.id));
    assert!(!mine_ids.contains(&basket.id));
    assert!(mine.iter().all(|p| p.vendor_name == "vera"));

    // Customer list: in-stock products from every vendor, sold-out hidden.
    let response = product_service::list_products(&state, &customer, page(1, 100)).await?;
    let shop = response.data.expect("products").items;
    let shop_ids: Vec<Uuid> = shop.iter().map(|p| p.id).collect();
    assert!(shop_ids.contains(&candle.id));
    assert!(shop_ids.contains(&basket.id));
    assert!(!shop_ids.contains(&stool.id));

    let basket_row = shop
        .iter()
        .find(|p| p.id == basket.id)
        .expect("basket listed");
    assert_eq!(basket_row.vendor_name, "nils");

    Ok(())
}

#[tokio::test]
async fn product_management_is_scoped_to_the_owner() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let owner = create_user(&state, "ossi", Role::Vendor).await?;
    let intruder = create_user(&state, "faye", Role::Vendor).await?;
    let customer = create_user(&state, "gus", Role::Customer).await?;

    let refused = product_service::create_product(
        &state,
        &customer,
        CreateProductRequest {
            name: "Bootleg Shelf".into(),
            description: "Should never exist".into(),
            price: 100,
            stock: 1,
        },
    )
    .await;
    assert!(matches!(refused, Err(AppError::Forbidden)));

    let created = product_service::create_product(
        &state,
        &owner,
        CreateProductRequest {
            name: "Scoped Shelf".into(),
            description: "Oak, wall-mounted".into(),
            price: 2500,
            stock: 7,
        },
    )
    .await?;
    let shelf = created.data.expect("created product");
    assert_eq!(shelf.vendor_id, owner.user_id);

    // Foreign updates and deletes read as missing, nothing changes.
    let foreign = product_service::update_product(
        &state,
        &intruder,
        shelf.id,
        UpdateProductRequest {
            name: None,
            description: None,
            price: Some(1),
            stock: None,
        },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::NotFound)));
    let foreign = product_service::delete_product(&state, &intruder, shelf.id).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));
    assert_eq!(product_stock(&state, shelf.id).await?, 7);

    let updated = product_service::update_product(
        &state,
        &owner,
        shelf.id,
        UpdateProductRequest {
            name: None,
            description: None,
            price: Some(2200),
            stock: Some(9),
        },
    )
    .await?;
    let shelf = updated.data.expect("updated product");
    assert_eq!(shelf.price, 2200);
    assert_eq!(shelf.stock, 9);

    let nothing = product_service::update_product(
        &state,
        &owner,
        shelf.id,
        UpdateProductRequest {
            name: None,
            description: None,
            price: None,
            stock: None,
        },
    )
    .await;
    assert!(matches!(nothing, Err(AppError::BadRequest(_))));

    product_service::delete_product(&state, &owner, shelf.id).await?;
    let gone: Option<(i32,)> = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(shelf.id)
        .fetch_optional(&state.pool)
        .await?;
    assert!(gone.is_none());

    Ok(())
}

// Repeated adds accumulate onto one line and live stock caps the quantity.
#[tokio::test]
async fn cart_accumulates_and_caps_at_stock() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let vendor = create_user(&state, "uma", Role::Vendor).await?;
    let customer = create_user(&state, "leo", Role::Customer).await?;
    let stranger = create_user(&state, "nan", Role::Customer).await?;

    let bowl = create_product(&state, &vendor, "Capped Bowl", 600, 5).await?;

    let refused = cart_service::add_to_cart(
        &state,
        &vendor,
        AddToCartRequest {
            product_id: bowl.id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(refused, Err(AppError::Forbidden)));

    let missing = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    let zero = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: bowl.id,
            quantity: 0,
        },
    )
    .await;
    assert!(matches!(zero, Err(AppError::BadRequest(_))));

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: bowl.id,
            quantity: 2,
        },
    )
    .await?;
    let line = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: bowl.id,
            quantity: 1,
        },
    )
    .await?;
    let line = line.data.expect("cart line");
    assert_eq!(line.quantity, 3, "same product accumulates onto one line");

    // 3 in the cart + 3 more would pass the stock of 5.
    let over = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: bowl.id,
            quantity: 3,
        },
    )
    .await;
    assert!(matches!(over, Err(AppError::BadRequest(_))));

    let listed = cart_service::list_cart(&state, &customer, page(1, 100)).await?;
    assert_eq!(listed.meta.expect("meta").total, Some(1));
    let items = listed.data.expect("cart").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product.id, bowl.id);
    assert_eq!(items[0].vendor_name, "uma");
    assert_eq!(items[0].quantity, 3);

    let updated = cart_service::update_cart_item(
        &state,
        &customer,
        line.id,
        UpdateCartItemRequest { quantity: 5 },
    )
    .await?;
    assert_eq!(updated.data.expect("cart line").quantity, 5);
    let over = cart_service::update_cart_item(
        &state,
        &customer,
        line.id,
        UpdateCartItemRequest { quantity: 9 },
    )
    .await;
    assert!(matches!(over, Err(AppError::BadRequest(_))));

    // A stranger can neither edit nor remove the line.
    let foreign = cart_service::update_cart_item(
        &state,
        &stranger,
        line.id,
        UpdateCartItemRequest { quantity: 1 },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::NotFound)));
    let foreign = cart_service::remove_from_cart(&state, &stranger, line.id).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));

    cart_service::remove_from_cart(&state, &customer, line.id).await?;
    let listed = cart_service::list_cart(&state, &customer, page(1, 100)).await?;
    assert_eq!(listed.meta.expect("meta").total, Some(0));

    Ok(())
}

// Two simultaneous first adds of the same product must merge onto the unique
// (customer, product) line, not trip the constraint into a store error.
#[tokio::test]
async fn concurrent_adds_merge_onto_one_line() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let vendor = create_user(&state, "ove", Role::Vendor).await?;
    let customer = create_user(&state, "zia", Role::Customer).await?;
    let bowl = create_product(&state, &vendor, "Merged Bowl", 300, 6).await?;

    let state_a = state.clone();
    let buyer_a = customer.clone();
    let product_id = bowl.id;
    let a = tokio::spawn(async move {
        cart_service::add_to_cart(
            &state_a,
            &buyer_a,
            AddToCartRequest {
                product_id,
                quantity: 2,
            },
        )
        .await
    });
    let state_b = state.clone();
    let buyer_b = customer.clone();
    let b = tokio::spawn(async move {
        cart_service::add_to_cart(
            &state_b,
            &buyer_b,
            AddToCartRequest {
                product_id,
                quantity: 2,
            },
        )
        .await
    });

    let first = a.await?;
    let second = b.await?;
    assert!(first.is_ok(), "first add failed: {:?}", first.err());
    assert!(second.is_ok(), "second add failed: {:?}", second.err());

    let listed = cart_service::list_cart(&state, &customer, page(1, 100)).await?;
    let items = listed.data.expect("cart").items;
    assert_eq!(items.len(), 1, "adds must land on one line");
    assert_eq!(items[0].quantity, 4);

    Ok(())
}
