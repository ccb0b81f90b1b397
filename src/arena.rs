//! Almacenamiento de nodos del árbol sintáctico.
//!
//! Todos los nodos de un mismo tipo que se construyen durante una
//! compilación residen en un único [`Arena`]. Los nodos padre refieren
//! a sus hijos por medio de índices tipados ([`Id`]) en vez de punteros,
//! por lo cual el árbol completo se libera de una sola vez al descartar
//! el arena. Un arena tiene capacidad fija: agotarla es un error.

use std::{
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    marker::PhantomData,
    ops::Index,
};

use thiserror::Error;

/// Capacidad por omisión, en nodos.
pub const DEFAULT_CAPACITY: usize = 65536;

/// Se agotó el espacio de un arena.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    #[error("Arena exhausted, capacity is {capacity} nodes")]
    Exhausted { capacity: usize },
}

/// Referencia a un nodo alojado en un [`Arena<T>`].
pub struct Id<T>(u32, PhantomData<T>);

impl<T> Id<T> {
    /// Posición del nodo dentro de su arena.
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl<T> Eq for Id<T> {}
impl<T> Copy for Id<T> {}
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_type_name = std::any::type_name::<T>();
        let type_name = full_type_name.split("::").last().unwrap_or("UNKNOWN");
        f.debug_tuple("Id").field(&type_name).field(&self.0).finish()
    }
}

/// Región de nodos de tipo `T` con capacidad fija.
#[derive(Debug)]
pub struct Arena<T> {
    nodes: Vec<T>,
    capacity: usize,
}

impl<T> Arena<T> {
    /// Crea un arena vacío que admite hasta `capacity` nodos.
    ///
    /// La capacidad se limita al rango representable por [`Id`].
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            nodes: Vec::new(),
            capacity: capacity.min(u32::MAX as usize),
        }
    }

    /// Aloja un nodo y retorna su referencia.
    pub fn alloc(&mut self, node: T) -> Result<Id<T>, ArenaError> {
        let index = self.nodes.len();
        if index >= self.capacity {
            return Err(ArenaError::Exhausted {
                capacity: self.capacity,
            });
        }

        self.nodes.push(node);
        Ok(Id(index as u32, PhantomData))
    }

    /// Cantidad de nodos alojados.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<T> Index<Id<T>> for Arena<T> {
    type Output = T;

    fn index(&self, id: Id<T>) -> &T {
        &self.nodes[id.idx()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_index() {
        let mut arena = Arena::with_capacity(4);
        let first = arena.alloc("first").unwrap();
        let second = arena.alloc("second").unwrap();

        assert_ne!(first, second);
        assert_eq!(arena[first], "first");
        assert_eq!(arena[second], "second");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_exhaustion() {
        let mut arena = Arena::with_capacity(2);
        arena.alloc(1).unwrap();
        arena.alloc(2).unwrap();

        assert_eq!(arena.alloc(3), Err(ArenaError::Exhausted { capacity: 2 }));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_zero_capacity() {
        let mut arena = Arena::<()>::with_capacity(0);
        assert!(arena.alloc(()).is_err());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_id_debug_names_type() {
        let mut arena = Arena::default();
        let id = arena.alloc(5u8).unwrap();
        assert_eq!(format!("{:?}", id), "Id(\"u8\", 0)");
    }
}
