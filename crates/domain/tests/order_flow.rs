//! Order placement and payment notification flows against the in-memory
//! store and gateways.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use common::{GeoPoint, Money, PageRequest, ProductId, UserId};
use domain::{
    AccountService, AnalyticsService, BranchService, CatalogService, DomainError, NewBranch,
    NewProduct, NotificationOutcome, OrderFilter, OrderItemInput, OrderService, Passwords,
    PlaceOrder, Principal, Registration,
};
use gateways::{InMemoryGeocoder, InMemoryPaymentGateway};
use store::{
    BranchId, BranchStore, Category, DateRange, InMemoryStore, OrderStatus, PaymentMethod,
    PaymentStatus, ProductStore, Role,
};

const BRANCH_ADDRESS: &str = "Jl. Medan Merdeka, Jakarta Pusat";

struct Shop {
    store: InMemoryStore,
    payments: InMemoryPaymentGateway,
    orders: OrderService<InMemoryStore>,
    customer: Principal,
    branch: BranchId,
    latte: ProductId,
    croissant: ProductId,
}

async fn principal(accounts: &AccountService<InMemoryStore>, email: &str) -> Principal {
    accounts
        .register(Registration {
            name: "Rina Kusuma".into(),
            email: email.into(),
            phone: "081234567890".into(),
            password: "secret123".into(),
        })
        .await
        .unwrap();
    let login = accounts.login(email, "secret123").await.unwrap();
    accounts.authenticate(&login.token).await.unwrap()
}

fn product(name: &str, price: i64, stock: i64) -> NewProduct {
    NewProduct {
        name: name.into(),
        description: format!("{name} made fresh every morning"),
        price,
        category: Category::Coffee,
        image: Some(format!("https://cdn.example.com/{}.jpg", name.to_lowercase())),
        stock,
        is_available: None,
    }
}

async fn shop() -> Shop {
    let store = InMemoryStore::new();
    let payments = InMemoryPaymentGateway::default();
    let geocoder = InMemoryGeocoder::new();
    geocoder.insert(BRANCH_ADDRESS, GeoPoint::new(-6.1754, 106.8272));

    let accounts = AccountService::new(store.clone())
        .with_passwords(Passwords::with_cost(8, 1).unwrap());
    let customer = principal(&accounts, "rina@example.com").await;

    let catalog = CatalogService::new(store.clone());
    let latte = catalog.create(product("Latte", 30_000, 10)).await.unwrap().id;
    let croissant = catalog
        .create(product("Croissant", 25_000, 2))
        .await
        .unwrap()
        .id;

    let branches = BranchService::new(store.clone(), Arc::new(geocoder));
    let branch = branches
        .create(NewBranch {
            name: "Monas".into(),
            address: BRANCH_ADDRESS.into(),
            phone: "0215551234".into(),
            operating_hours: BTreeMap::new(),
            is_active: None,
        })
        .await
        .unwrap()
        .id;

    let orders = OrderService::new(store.clone(), Arc::new(payments.clone()));

    Shop {
        store,
        payments,
        orders,
        customer,
        branch,
        latte,
        croissant,
    }
}

fn request(shop: &Shop, method: PaymentMethod, items: &[(ProductId, i64)]) -> PlaceOrder {
    PlaceOrder {
        branch_id: shop.branch,
        items: items
            .iter()
            .map(|(product_id, quantity)| OrderItemInput {
                product_id: *product_id,
                quantity: *quantity,
            })
            .collect(),
        payment_method: method,
    }
}

async fn stock_of(shop: &Shop, id: ProductId) -> u32 {
    shop.store.find_product(id).await.unwrap().unwrap().stock
}

mod placement {
    use super::*;

    #[tokio::test]
    async fn cash_order_is_paid_and_processing() {
        let shop = shop().await;
        let placed = shop
            .orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Cash, &[(shop.latte, 2), (shop.croissant, 1)]),
            )
            .await
            .unwrap();

        let order = &placed.order;
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Success);
        assert!(order.payment_details.paid_at.is_some());
        assert_eq!(order.total_amount.amount(), 85_000);
        assert_eq!(order.branch_name, "Monas");
        assert!(order.order_number.starts_with("ORDER-"));
        assert!(placed.payment_token.is_none());
        assert!(shop.payments.transactions().is_empty());

        assert_eq!(stock_of(&shop, shop.latte).await, 8);
        assert_eq!(stock_of(&shop, shop.croissant).await, 1);
    }

    #[tokio::test]
    async fn midtrans_order_returns_snap_session() {
        let shop = shop().await;
        let placed = shop
            .orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Midtrans, &[(shop.latte, 1)]),
            )
            .await
            .unwrap();

        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert_eq!(placed.order.payment_status, PaymentStatus::Pending);
        assert!(placed.payment_token.is_some());
        assert!(placed.payment_url.is_some());
        assert_eq!(
            placed.order.payment_details.snap_token,
            placed.payment_token
        );

        let sent = shop.payments.transactions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].order_id, placed.order.order_number);
        assert_eq!(sent[0].gross_amount.amount(), 30_000);
        assert_eq!(sent[0].customer.first_name, "Rina");
        assert_eq!(sent[0].customer.last_name, "Kusuma");
    }

    #[tokio::test]
    async fn insufficient_stock_is_rejected_without_reserving() {
        let shop = shop().await;
        let err = shop
            .orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Cash, &[(shop.latte, 1), (shop.croissant, 3)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));
        assert_eq!(stock_of(&shop, shop.latte).await, 10);
        assert_eq!(shop.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_product_and_branch_are_rejected() {
        let shop = shop().await;
        let missing = ProductId::new();
        let err = shop
            .orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Cash, &[(missing, 1)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Product", .. }));

        let mut req = request(&shop, PaymentMethod::Cash, &[(shop.latte, 1)]);
        req.branch_id = BranchId::new();
        let err = shop
            .orders
            .place_order(shop.customer.user_id, req)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::BranchUnavailable));
    }

    #[tokio::test]
    async fn unavailable_product_is_rejected() {
        let shop = shop().await;
        let mut latte = shop.store.find_product(shop.latte).await.unwrap().unwrap();
        latte.is_available = false;
        shop.store.update_product(&latte).await.unwrap();

        let err = shop
            .orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Cash, &[(shop.croissant, 1), (shop.latte, 1)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::ProductUnavailable(ref name) if name == "Latte"));
        assert_eq!(stock_of(&shop, shop.latte).await, 10);
        assert_eq!(stock_of(&shop, shop.croissant).await, 2);
        assert_eq!(shop.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn inactive_branch_is_rejected() {
        let shop = shop().await;
        let mut branch = shop.store.find_branch(shop.branch).await.unwrap().unwrap();
        branch.is_active = false;
        shop.store.update_branch(&branch).await.unwrap();

        let err = shop
            .orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Cash, &[(shop.latte, 1)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::BranchUnavailable));
        assert_eq!(stock_of(&shop, shop.latte).await, 10);
        assert_eq!(shop.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn overflowing_total_is_rejected_before_reserving() {
        let shop = shop().await;
        let mut latte = shop.store.find_product(shop.latte).await.unwrap().unwrap();
        latte.price = Money::from_amount(i64::MAX / 2 + 1);
        shop.store.update_product(&latte).await.unwrap();

        let err = shop
            .orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Cash, &[(shop.latte, 2)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("too large")));
        assert_eq!(stock_of(&shop, shop.latte).await, 10);
        assert_eq!(shop.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn gateway_failure_keeps_reservation() {
        let shop = shop().await;
        shop.payments.set_fail_on_create(true);

        let err = shop
            .orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Midtrans, &[(shop.latte, 4)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::PaymentGateway(_)));
        assert_eq!(shop.store.order_count().await, 0);
        assert_eq!(stock_of(&shop, shop.latte).await, 6);
    }
}

mod visibility {
    use super::*;

    #[tokio::test]
    async fn customers_only_see_their_own_orders() {
        let shop = shop().await;
        let placed = shop
            .orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Cash, &[(shop.latte, 1)]),
            )
            .await
            .unwrap();

        let found = shop
            .orders
            .get_order(&shop.customer, placed.order.id)
            .await
            .unwrap();
        assert_eq!(found.id, placed.order.id);

        let stranger = Principal {
            user_id: UserId::new(),
            ..shop.customer.clone()
        };
        assert!(matches!(
            shop.orders.get_order(&stranger, placed.order.id).await,
            Err(DomainError::NotFound { .. })
        ));

        let admin = Principal {
            role: Role::Admin,
            ..stranger
        };
        assert!(shop.orders.get_order(&admin, placed.order.id).await.is_ok());

        let mine = shop
            .orders
            .user_orders(shop.customer.user_id, OrderFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(mine.pagination.total, 1);

        let theirs = shop
            .orders
            .user_orders(UserId::new(), OrderFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert!(theirs.data.is_empty());
    }

    #[tokio::test]
    async fn admin_listing_filters_by_status() {
        let shop = shop().await;
        shop.orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Cash, &[(shop.latte, 1)]),
            )
            .await
            .unwrap();
        shop.orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Midtrans, &[(shop.latte, 1)]),
            )
            .await
            .unwrap();

        let pending = shop
            .orders
            .all_orders(
                OrderFilter {
                    status: Some(OrderStatus::Pending),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(pending.data.len(), 1);
        assert_eq!(pending.data[0].payment_method, PaymentMethod::Midtrans);
    }

    #[tokio::test]
    async fn update_status_persists() {
        let shop = shop().await;
        let placed = shop
            .orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Cash, &[(shop.latte, 1)]),
            )
            .await
            .unwrap();

        let updated = shop
            .orders
            .update_status(placed.order.id, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Completed);

        let reloaded = shop
            .orders
            .get_order(&shop.customer, placed.order.id)
            .await
            .unwrap();
        assert_eq!(reloaded.status, OrderStatus::Completed);
    }
}

mod notifications {
    use super::*;

    async fn pending_order(shop: &Shop) -> String {
        shop.orders
            .place_order(
                shop.customer.user_id,
                request(shop, PaymentMethod::Midtrans, &[(shop.latte, 1)]),
            )
            .await
            .unwrap()
            .order
            .order_number
    }

    #[tokio::test]
    async fn settlement_moves_pending_order_to_processing() {
        let shop = shop().await;
        let number = pending_order(&shop).await;

        let mut notification = shop
            .payments
            .signed_notification(&number, "200", "30000.00", "settlement");
        notification.transaction_id = Some("tx-7f3a".into());
        let outcome = shop
            .orders
            .handle_payment_notification(notification)
            .await
            .unwrap();

        let NotificationOutcome::Updated(order) = outcome else {
            panic!("expected the order to be updated");
        };
        assert_eq!(order.payment_status, PaymentStatus::Success);
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(
            order.payment_details.transaction_status.as_deref(),
            Some("settlement")
        );
        assert_eq!(order.payment_details.status_code.as_deref(), Some("200"));
        assert!(order.payment_details.paid_at.is_some());
        assert_eq!(
            order.payment_details.gateway_order_id.as_deref(),
            Some(number.as_str())
        );
        assert_eq!(order.payment_details.transaction_id.as_deref(), Some("tx-7f3a"));
    }

    #[tokio::test]
    async fn expire_cancels_the_order() {
        let shop = shop().await;
        let number = pending_order(&shop).await;

        let notification = shop
            .payments
            .signed_notification(&number, "407", "30000.00", "expire");
        let NotificationOutcome::Updated(order) = shop
            .orders
            .handle_payment_notification(notification)
            .await
            .unwrap()
        else {
            panic!("expected the order to be updated");
        };
        assert_eq!(order.payment_status, PaymentStatus::Canceled);
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.payment_details.paid_at.is_none());
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let shop = shop().await;
        let number = pending_order(&shop).await;

        let mut notification = shop
            .payments
            .signed_notification(&number, "200", "30000.00", "settlement");
        notification.gross_amount = "1.00".into();

        let err = shop
            .orders
            .handle_payment_notification(notification)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidSignature));

        let page = shop
            .orders
            .all_orders(OrderFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.data[0].payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_order_is_acknowledged() {
        let shop = shop().await;
        let notification =
            shop.payments
                .signed_notification("ORDER-0-deadbeef", "200", "1.00", "settlement");
        let outcome = shop
            .orders
            .handle_payment_notification(notification)
            .await
            .unwrap();
        assert!(matches!(outcome, NotificationOutcome::UnknownOrder));
    }
}

mod analytics {
    use super::*;

    #[tokio::test]
    async fn reports_only_count_successful_payments() {
        let shop = shop().await;
        shop.orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Cash, &[(shop.latte, 2)]),
            )
            .await
            .unwrap();
        // Awaiting payment; excluded.
        shop.orders
            .place_order(
                shop.customer.user_id,
                request(&shop, PaymentMethod::Midtrans, &[(shop.croissant, 1)]),
            )
            .await
            .unwrap();

        let analytics = AnalyticsService::new(shop.store.clone());

        let sales = analytics.sales(DateRange::default()).await.unwrap();
        assert_eq!(sales.total_orders, 1);
        assert_eq!(sales.total_sales.amount(), 60_000);
        assert_eq!(sales.average_order_value.amount(), 60_000);

        let products = analytics
            .top_products(DateRange::default(), None)
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_name, "Latte");
        assert_eq!(products[0].total_quantity, 2);

        let branches = analytics
            .branch_performance(DateRange::default(), Some(5))
            .await
            .unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].branch_name, "Monas");

        let future = DateRange::new(Some(Utc::now() + chrono::Duration::days(1)), None);
        assert_eq!(analytics.sales(future).await.unwrap().total_orders, 0);
    }
}
