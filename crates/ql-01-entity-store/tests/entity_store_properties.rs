//! # Entity Store Properties
//!
//! Behavioural properties of the store exercised through the public API
//! against both storage adapters.

use ql_01_entity_store::{
    EntityData, EntityError, EntityRepository, EntityResult, EntityService, EntityStore,
    InMemoryEntityStore, InMemoryKVStore, KvEntityStore, MetaData, Representation,
};
use serde::{Deserialize, Serialize};
use shared_types::{EntityId, ErrorKind};
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// FIXTURES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Author {
    id: EntityId,
    name: String,
}

impl ql_01_entity_store::Entity for Author {
    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Book {
    id: EntityId,
    title: String,
    author: Author,
}

impl ql_01_entity_store::Entity for Book {
    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Serialize, Deserialize)]
struct BookRecord {
    id: EntityId,
    title: String,
    author_id: EntityId,
}

#[derive(Serialize, Deserialize)]
struct NormalizedBook {
    id: EntityId,
    title: String,
    author: Author,
}

struct AuthorSchema;

impl MetaData for AuthorSchema {
    type Entity = Author;
    type Storable = Author;
    type Normalized = Author;

    fn name(&self) -> &'static str {
        "Author"
    }

    fn from_storable(&self, _: &EntityRepository, storable: Author) -> EntityResult<Author> {
        Ok(storable)
    }

    fn normalize(&self, entity: &Author) -> EntityResult<Author> {
        Ok(entity.clone())
    }

    fn denormalize(&self, normalized: Author) -> EntityResult<Author> {
        Ok(normalized)
    }
}

impl Representation for AuthorSchema {
    type MetaData = Self;

    fn metadata(&self) -> &Self {
        self
    }

    fn to_storable(&self, entity: &Author) -> EntityResult<Author> {
        Ok(entity.clone())
    }

    fn keynames(&self, _: &Author) -> EntityResult<Vec<String>> {
        Ok(vec!["authors".to_string()])
    }
}

struct BookSchema;

impl MetaData for BookSchema {
    type Entity = Book;
    type Storable = BookRecord;
    type Normalized = NormalizedBook;

    fn name(&self) -> &'static str {
        "Book"
    }

    fn from_storable(&self, repository: &EntityRepository, record: BookRecord) -> EntityResult<Book> {
        Ok(Book {
            id: record.id,
            title: record.title,
            author: repository.retrieve_by_id(&AuthorSchema, &record.author_id)?,
        })
    }

    fn normalize(&self, book: &Book) -> EntityResult<NormalizedBook> {
        Ok(NormalizedBook {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
        })
    }

    fn denormalize(&self, normalized: NormalizedBook) -> EntityResult<Book> {
        Ok(Book {
            id: normalized.id,
            title: normalized.title,
            author: normalized.author,
        })
    }
}

impl Representation for BookSchema {
    type MetaData = Self;

    fn metadata(&self) -> &Self {
        self
    }

    fn to_storable(&self, book: &Book) -> EntityResult<BookRecord> {
        Ok(BookRecord {
            id: book.id,
            title: book.title.clone(),
            author_id: book.author.id,
        })
    }

    fn keynames(&self, book: &Book) -> EntityResult<Vec<String>> {
        Ok(vec![
            "books".to_string(),
            format!("books:by_author_id:{}", book.author.id),
        ])
    }

    fn sync(&self, service: &EntityService, book: &Book) -> EntityResult<()> {
        if !service.repository().exists(&AuthorSchema, &book.author.id)? {
            service.save(&book.author, &AuthorSchema)?;
        }
        Ok(())
    }
}

fn make_author(name: &str) -> Author {
    Author {
        id: Uuid::new_v4(),
        name: name.to_string(),
    }
}

fn make_book(title: &str, author: &Author) -> Book {
    Book {
        id: Uuid::new_v4(),
        title: title.to_string(),
        author: author.clone(),
    }
}

fn stores() -> Vec<Arc<dyn EntityStore>> {
    vec![
        Arc::new(InMemoryEntityStore::new()),
        Arc::new(KvEntityStore::new(InMemoryKVStore::new())),
    ]
}

// =============================================================================
// ROUND-TRIP
// =============================================================================

#[test]
fn test_normalized_bytes_round_trip() {
    let book = make_book("Dune", &make_author("Herbert"));
    let bytes = BookSchema.encode(&book).unwrap();
    let repository = EntityRepository::new(Arc::new(InMemoryEntityStore::new()));

    let decoded = BookSchema
        .to_entity(&repository, EntityData::Encoded(&bytes))
        .unwrap();

    assert_eq!(decoded, book);
}

#[test]
fn test_storable_round_trip_through_store() {
    for store in stores() {
        let service = EntityService::new(store);
        let book = make_book("Dune", &make_author("Herbert"));
        service.save(&book, &BookSchema).unwrap();

        let record = BookSchema.to_storable(&book).unwrap();
        let rebuilt = BookSchema
            .to_entity(&service.repository(), EntityData::Storable(record))
            .unwrap();

        assert_eq!(rebuilt, book);
    }
}

#[test]
fn test_garbage_bytes_are_decode_errors() {
    let err = BookSchema.decode(b"not json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[test]
fn test_missing_nested_reference_propagates() {
    let repository = EntityRepository::new(Arc::new(InMemoryEntityStore::new()));
    let record = BookRecord {
        id: Uuid::new_v4(),
        title: "Orphan".to_string(),
        author_id: Uuid::new_v4(),
    };
    let err = BookSchema
        .to_entity(&repository, EntityData::Storable(record))
        .unwrap_err();
    assert!(matches!(err, EntityError::NotFound { .. }));
}

// =============================================================================
// SAVE IS NOT AN UPSERT
// =============================================================================

#[test]
fn test_second_save_rejected_on_every_adapter() {
    for store in stores() {
        let service = EntityService::new(store.clone());
        let author = make_author("Le Guin");
        let book = make_book("Earthsea", &author);
        service.save(&book, &BookSchema).unwrap();
        let before = store.state_hash().unwrap();

        let mut renamed = book.clone();
        renamed.title = "Changed".to_string();
        let err = service.save(&renamed, &BookSchema).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.state_hash().unwrap(), before);
        assert_eq!(
            service
                .repository()
                .retrieve_by_id(&BookSchema, &book.id)
                .unwrap()
                .title,
            "Earthsea"
        );
    }
}

// =============================================================================
// INDEX SYMMETRY
// =============================================================================

#[test]
fn test_save_then_delete_restores_index_state() {
    for store in stores() {
        let service = EntityService::new(store.clone());
        let author = make_author("Butler");
        service.save(&author, &AuthorSchema).unwrap();
        let before = store.state_hash().unwrap();

        let book = make_book("Kindred", &author);
        service.save(&book, &BookSchema).unwrap();
        for key in BookSchema.keynames(&book).unwrap() {
            let members = store.retrieve_set(&key, 0, 10).unwrap();
            assert!(members.contains(&book.id.to_string()));
        }

        service.delete(&book, &BookSchema).unwrap();
        for key in BookSchema.keynames(&book).unwrap() {
            assert_eq!(store.set_len(&key).unwrap(), 0);
        }
        assert_eq!(store.state_hash().unwrap(), before);
    }
}

#[test]
fn test_adapters_agree_on_state_hash() {
    let author = make_author("Banks");
    let books: Vec<_> = (0..4)
        .map(|i| make_book(&format!("Culture {}", i), &author))
        .collect();

    let hashes: Vec<_> = stores()
        .into_iter()
        .map(|store| {
            let service = EntityService::new(store.clone());
            for book in &books {
                service.save(book, &BookSchema).unwrap();
            }
            service.delete(&books[1], &BookSchema).unwrap();
            store.state_hash().unwrap()
        })
        .collect();

    assert_eq!(hashes[0], hashes[1]);
}

// =============================================================================
// PAGINATION
// =============================================================================

#[test]
fn test_every_page_respects_pagination_invariant() {
    for store in stores() {
        let service = EntityService::new(store);
        let author = make_author("Wolfe");
        for i in 0..7 {
            service
                .save(&make_book(&format!("Book {}", i), &author), &BookSchema)
                .unwrap();
        }
        let repository = service.repository();

        for amount in 1..=8 {
            let mut index = 0;
            let mut seen = Vec::new();
            loop {
                let page = repository
                    .retrieve_set_by_keyname(&BookSchema, "books", index, amount)
                    .unwrap();
                assert!(page.index() + page.amount() <= page.total_amount());
                assert_eq!(page.total_amount(), 7);
                seen.extend(page.instances().iter().map(|b| b.id.to_string()));
                if page.is_last() {
                    break;
                }
                index += page.amount();
            }
            let mut sorted = seen.clone();
            sorted.sort();
            assert_eq!(seen, sorted);
            assert_eq!(seen.len(), 7);
        }
    }
}

#[test]
fn test_intersection_pages_through_shared_members() {
    for store in stores() {
        let service = EntityService::new(store.clone());
        let first = make_author("Gibson");
        let second = make_author("Sterling");
        for i in 0..3 {
            service
                .save(&make_book(&format!("G{}", i), &first), &BookSchema)
                .unwrap();
        }
        service.save(&make_book("S0", &second), &BookSchema).unwrap();

        let keys = vec![
            "books".to_string(),
            format!("books:by_author_id:{}", first.id),
        ];
        let page = service
            .repository()
            .retrieve_set_by_intersect_keynames(&BookSchema, &keys, 1, 5)
            .unwrap();

        assert_eq!(page.total_amount(), 3);
        assert_eq!(page.amount(), 2);
        assert!(page.instances().iter().all(|b| b.author == first));
        assert!(page.is_last());
    }
}
