//! A book shared between a simulation thread and readers.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::book::{Book, PageRenderer};
use crate::error::TextResult;
use crate::input::InputQueue;

/// Thread-safe handle to a [`Book`].
///
/// One coarse lock covers the tree, the behaviour list and the spatial index.
/// Steps take the write lock, so readers such as a renderer never observe a
/// tree mid-restructure. Input is pushed through a separate queue and never
/// needs the lock.
///
/// # Example
///
/// ```
/// use kinetext_core::{Book, SharedBook};
///
/// let shared = SharedBook::new(Book::new());
/// let input = shared.input_queue();
/// input.push(kinetext_core::InputEvent::MouseMoved { x: 4.0, y: 2.0 });
///
/// shared.step().unwrap();
/// assert_eq!(shared.read().frame_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SharedBook {
    book: Arc<RwLock<Book>>,
    input: InputQueue,
}

impl SharedBook {
    /// Wrap a book.
    #[must_use]
    pub fn new(book: Book) -> Self {
        let input = book.input_queue();
        Self {
            book: Arc::new(RwLock::new(book)),
            input,
        }
    }

    /// Producer handle for host input callbacks.
    #[must_use]
    pub fn input_queue(&self) -> InputQueue {
        self.input.clone()
    }

    /// Advance the book by one frame under the write lock.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Book::step`].
    pub fn step(&self) -> TextResult<()> {
        self.write().step()
    }

    /// Render the book under the read lock.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Book::draw`].
    pub fn draw(&self, renderer: &mut dyn PageRenderer) -> TextResult<()> {
        self.read().draw(renderer)
    }

    /// Shared access to the book.
    #[must_use]
    pub fn read(&self) -> RwLockReadGuard<'_, Book> {
        self.book.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the book.
    #[must_use]
    pub fn write(&self) -> RwLockWriteGuard<'_, Book> {
        self.book.write().unwrap_or_else(PoisonError::into_inner)
    }
}
