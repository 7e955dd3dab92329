//! # Storefront
//!
//! Client-side commerce core: a cart ledger and an order transition engine.
//!
//! ## Core Concepts
//!
//! - **Cart ledger** ([`cart`]): a pure reducer over product quantities whose
//!   total is recomputed on every action
//! - **Order engine** ([`orders`]): places orders from frozen cart snapshots
//!   and moves them through `pending → processing → shipped → delivered`,
//!   with cancellation and refunds
//! - **Collaborators**: orders live in an [`repository::OrderRepository`],
//!   products come from a [`catalog::ProductCatalog`], and the signed-in user
//!   from a [`session::Session`]
//! - **Checkout** ([`checkout`]): a [`checkout::ShopSession`] ties one
//!   shopper's cart to the shared engine
//!
//! Both the cart and the engine run on [`storefront_runtime::Store`], so every
//! change is broadcast to observers after it is applied.
//!
//! ## Example
//!
//! ```ignore
//! let engine = Arc::new(OrderEngine::new(OrderEnvironment::new(
//!     Arc::new(InMemoryOrderRepository::new()),
//!     Arc::new(SystemClock),
//!     Arc::new(UuidIdGenerator),
//! )));
//! let shop = ShopSession::new(engine, Arc::new(catalog), Arc::new(StaticSession::signed_in("1")));
//!
//! shop.add_product(ProductId::new("1"), 2).await?;
//! let order = shop.checkout(address, "credit_card").await?;
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod orders;
pub mod repository;
pub mod session;
pub mod telemetry;
pub mod types;

pub use cart::{CartAction, CartLine, CartReducer, CartState};
pub use catalog::{CatalogError, InMemoryCatalog, ProductCatalog};
pub use checkout::ShopSession;
pub use config::{ConfigError, StorefrontConfig};
pub use error::OrderError;
pub use orders::{
    Order, OrderAction, OrderBook, OrderEngine, OrderEnvironment, OrderItem, OrderStatus,
    PaymentStatus, ShippingAddress, TransitionPolicy,
};
pub use repository::{InMemoryOrderRepository, OrderRepository, RepositoryError};
pub use session::{Session, StaticSession};
pub use types::{Money, OrderId, Product, ProductId, UserId};
