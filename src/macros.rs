/// Implements `From<$ty> for Node` for each `$ty => $variant` pair.
macro_rules! impl_node_from {
    ($($ty: ident => $variant: ident),+ $(,)?) => {
        $(
            impl From<$ty> for Node {
                fn from(value: $ty) -> Self {
                    Node::$variant(value)
                }
            }
        )+
    };
}

/// Looks up a node, failing with `DanglingHandle` for handles the arena does
/// not hold.
macro_rules! try_get_node {
    ($arena: expr, $id: expr) => {
        $arena
            .get($id)
            .ok_or($crate::err::SerializationError::DanglingHandle { node: $id })?
    };
}
