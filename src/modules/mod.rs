pub mod books;
pub mod library;
pub mod search;

use std::sync::Arc;

use shelf_kernel::{settings::Settings, ModuleRegistry};
use sqlx::SqlitePool;

use books::{repository::BookRepository, BookService, BooksModule};
use library::{repository::LibraryRepository, LibraryModule, LibraryService};
use search::{providers::ExternalLookup, SearchModule, SearchService};

/// Services shared by the modules, built once at bootstrap.
#[derive(Clone)]
pub struct Services {
    pub books: BookService,
    pub library: LibraryService,
    pub search: SearchService,
}

/// Build the services and register every module. Registration order is
/// migration order, so `books` goes first.
pub fn register_all(
    registry: &mut ModuleRegistry,
    pool: &SqlitePool,
    settings: &Settings,
    lookup: ExternalLookup,
) -> Services {
    let books = BookService::new(BookRepository::new(pool.clone()));
    let entries = LibraryRepository::new(pool.clone());
    let library = LibraryService::new(entries.clone(), books.clone());
    let search = SearchService::new(
        books.repository().clone(),
        entries,
        lookup,
        settings.search.clone(),
    );

    registry.register(Arc::new(BooksModule::new(books.clone())));
    registry.register(Arc::new(LibraryModule::new(library.clone())));
    registry.register(Arc::new(SearchModule::new(search.clone())));

    Services {
        books,
        library,
        search,
    }
}
