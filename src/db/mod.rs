pub mod books;
pub mod postgres;

pub use books::BookStore;
pub use books::StoredBook;
pub use postgres::create_pool;
