// test_types.rs - Small value types used across container tests

#[derive(Clone, Debug, PartialEq)]
pub struct StringData {
    pub my_string: String,
}

impl StringData {
    pub fn new(input: &str) -> Self {
        Self {
            my_string: input.to_string(),
        }
    }
}

impl Default for StringData {
    fn default() -> Self {
        Self::new("default")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DoubleData {
    pub my_double: f64,
}

impl Default for DoubleData {
    fn default() -> Self {
        Self { my_double: 1.61803 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntData {
    pub my_int: i32,
}

impl IntData {
    pub fn new(my_int: i32) -> Self {
        Self { my_int }
    }
}

impl Default for IntData {
    fn default() -> Self {
        Self::new(55)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoolData {
    pub my_bool: bool,
}

impl BoolData {
    pub fn new(my_bool: bool) -> Self {
        Self { my_bool }
    }
}

impl Default for BoolData {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CharData {
    pub my_char: char,
}

impl Default for CharData {
    fn default() -> Self {
        Self { my_char: 'c' }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FloatData {
    pub my_float: f32,
}

impl Default for FloatData {
    fn default() -> Self {
        Self { my_float: 9.5 }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct VectorDoubleData {
    pub my_vector: Vec<f64>,
}

impl VectorDoubleData {
    pub fn new(my_vector: Vec<f64>) -> Self {
        Self { my_vector }
    }
}

/// No `Default`: can be inserted or queried, never auto-created.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiData {
    pub my_string: String,
    pub my_int: i32,
}

/// Build a container holding the default value of each listed type,
/// with every slot left unqueried.
#[macro_export]
macro_rules! create_some_data {
    ($($ty:ty),+ $(,)?) => {{
        let mut data = $crate::data::CompositeData::new();
        $(
            data.insert_or_assign(<$ty as ::std::default::Default>::default());
        )+
        data
    }};
}
