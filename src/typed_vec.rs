/// Declares an index type and a vector that can only be indexed by it.
///
/// Arcs and graph vertices both live in flat vectors and refer to one another
/// by position; giving each its own index type keeps us from mixing them up.
macro_rules! typed_vec {
    ($(#[$meta:meta])* $vis:vis $idx_name:ident, $vec_name:ident, $dbg_prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
        $vis struct $idx_name(pub(crate) usize);

        impl std::fmt::Debug for $idx_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", $dbg_prefix, self.0)
            }
        }

        #[doc = concat!("A vector indexed by [`", stringify!($idx_name), "`].")]
        #[derive(Clone)]
        $vis struct $vec_name<T> {
            inner: Vec<T>,
        }

        #[allow(dead_code)]
        impl<T> $vec_name<T> {
            /// Returns an iterator over all indices into this vector.
            pub fn indices(&self) -> impl Iterator<Item = $idx_name> {
                (0..self.inner.len()).map($idx_name)
            }

            /// The length of this vector.
            pub fn len(&self) -> usize {
                self.inner.len()
            }

            /// Are we empty?
            pub fn is_empty(&self) -> bool {
                self.inner.is_empty()
            }

            /// Adds a new element, returning its index.
            pub fn push(&mut self, elt: T) -> $idx_name {
                self.inner.push(elt);
                $idx_name(self.len() - 1)
            }

            /// Returns an iterator over indices and elements.
            pub fn iter(&self) -> impl Iterator<Item = ($idx_name, &T)> + '_ {
                self.inner
                    .iter()
                    .enumerate()
                    .map(|(idx, t)| ($idx_name(idx), t))
            }
        }

        impl<T> Default for $vec_name<T> {
            fn default() -> Self {
                Self { inner: Vec::new() }
            }
        }

        impl<T> FromIterator<T> for $vec_name<T> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                Self {
                    inner: iter.into_iter().collect(),
                }
            }
        }

        impl<T> std::ops::Index<$idx_name> for $vec_name<T> {
            type Output = T;

            fn index(&self, index: $idx_name) -> &Self::Output {
                &self.inner[index.0]
            }
        }

        impl<T> std::ops::IndexMut<$idx_name> for $vec_name<T> {
            fn index_mut(&mut self, index: $idx_name) -> &mut T {
                &mut self.inner[index.0]
            }
        }

        impl<T: std::fmt::Debug> std::fmt::Debug for $vec_name<T> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                struct Entry<'a, T> {
                    idx: $idx_name,
                    inner: &'a T,
                }

                impl<T: std::fmt::Debug> std::fmt::Debug for Entry<'_, T> {
                    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        write!(f, "{idx:?}: {inner:?}", idx = self.idx, inner = self.inner,)
                    }
                }

                let mut list = f.debug_list();
                for (idx, inner) in self.iter() {
                    list.entry(&Entry { idx, inner });
                }
                list.finish()
            }
        }
    };
}
