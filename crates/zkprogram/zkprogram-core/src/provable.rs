//! Provable types: values that can be laid out as a fixed number of field elements
//!
//! [`Provable`] is the witness capability. [`WitnessType`] and [`WitnessValue`]
//! are its type-erased forms, used where a method's parameters of different
//! types have to live in one list.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::rc::Rc;

use crate::{Result, Scalar, ZkProgramError};

/// Non-field data carried next to the field encoding
pub type Auxiliary = Vec<u8>;

/// A type with a fixed-width field encoding
pub trait Provable: Clone + PartialEq + fmt::Debug + 'static {
    /// Number of field elements in the encoding
    fn size_in_fields() -> usize;

    /// Field encoding of the value
    fn to_fields(&self) -> Vec<Scalar>;

    /// Decode a value from its field encoding and auxiliary data
    fn from_fields(fields: &[Scalar], aux: &Auxiliary) -> Result<Self>;

    /// Auxiliary (non-field) data of the value
    fn to_auxiliary(&self) -> Auxiliary {
        Auxiliary::new()
    }

    /// Auxiliary data used when no value is available
    fn empty_auxiliary() -> Auxiliary {
        Auxiliary::new()
    }
}

fn check_length<T>(fields: &[Scalar], expected: usize) -> Result<()> {
    if fields.len() != expected {
        return Err(ZkProgramError::InvalidFieldLength {
            type_name: type_name::<T>().to_string(),
            expected,
            actual: fields.len(),
        });
    }
    Ok(())
}

impl Provable for Scalar {
    fn size_in_fields() -> usize {
        1
    }

    fn to_fields(&self) -> Vec<Scalar> {
        vec![*self]
    }

    fn from_fields(fields: &[Scalar], _aux: &Auxiliary) -> Result<Self> {
        check_length::<Self>(fields, 1)?;
        Ok(fields[0])
    }
}

impl Provable for bool {
    fn size_in_fields() -> usize {
        1
    }

    fn to_fields(&self) -> Vec<Scalar> {
        vec![if *self { Scalar::one() } else { Scalar::zero() }]
    }

    fn from_fields(fields: &[Scalar], _aux: &Auxiliary) -> Result<Self> {
        check_length::<Self>(fields, 1)?;
        if fields[0] == Scalar::zero() {
            Ok(false)
        } else if fields[0] == Scalar::one() {
            Ok(true)
        } else {
            Err(ZkProgramError::InvalidField(
                "boolean must be 0 or 1".to_string(),
            ))
        }
    }
}

impl Provable for u64 {
    fn size_in_fields() -> usize {
        1
    }

    fn to_fields(&self) -> Vec<Scalar> {
        vec![Scalar::from(*self)]
    }

    fn from_fields(fields: &[Scalar], _aux: &Auxiliary) -> Result<Self> {
        check_length::<Self>(fields, 1)?;
        let bytes = fields[0].to_bytes();
        if bytes[8..].iter().any(|b| *b != 0) {
            return Err(ZkProgramError::InvalidField(
                "value does not fit in 64 bits".to_string(),
            ));
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&bytes[..8]);
        Ok(u64::from_le_bytes(low))
    }
}

/// The zero-width type, used for a missing public input or output
impl Provable for () {
    fn size_in_fields() -> usize {
        0
    }

    fn to_fields(&self) -> Vec<Scalar> {
        Vec::new()
    }

    fn from_fields(fields: &[Scalar], _aux: &Auxiliary) -> Result<Self> {
        check_length::<Self>(fields, 0)
    }
}

impl<T: Provable, const N: usize> Provable for [T; N] {
    fn size_in_fields() -> usize {
        T::size_in_fields() * N
    }

    fn to_fields(&self) -> Vec<Scalar> {
        self.iter().flat_map(|item| item.to_fields()).collect()
    }

    fn from_fields(fields: &[Scalar], aux: &Auxiliary) -> Result<Self> {
        check_length::<Self>(fields, Self::size_in_fields())?;
        let width = T::size_in_fields();
        let mut items = Vec::with_capacity(N);
        for i in 0..N {
            items.push(T::from_fields(&fields[i * width..(i + 1) * width], aux)?);
        }
        items.try_into().map_err(|_| ZkProgramError::InvalidFieldLength {
            type_name: type_name::<Self>().to_string(),
            expected: N,
            actual: fields.len(),
        })
    }
}

impl<A: Provable, B: Provable> Provable for (A, B) {
    fn size_in_fields() -> usize {
        A::size_in_fields() + B::size_in_fields()
    }

    fn to_fields(&self) -> Vec<Scalar> {
        let mut fields = self.0.to_fields();
        fields.extend(self.1.to_fields());
        fields
    }

    fn from_fields(fields: &[Scalar], aux: &Auxiliary) -> Result<Self> {
        check_length::<Self>(fields, Self::size_in_fields())?;
        let (left, right) = fields.split_at(A::size_in_fields());
        Ok((A::from_fields(left, aux)?, B::from_fields(right, aux)?))
    }
}

/// The value decoded from all-zero fields
pub fn empty_value<T: Provable>() -> Result<T> {
    T::from_fields(&vec![Scalar::zero(); T::size_in_fields()], &T::empty_auxiliary())
}

fn decode_erased<T: Provable>(fields: &[Scalar], aux: &Auxiliary) -> Result<WitnessValue> {
    T::from_fields(fields, aux).map(WitnessValue::new)
}

/// Type-erased descriptor of a [`Provable`] type
#[derive(Clone)]
pub struct WitnessType {
    name: &'static str,
    type_id: TypeId,
    size_in_fields: usize,
    decode: fn(&[Scalar], &Auxiliary) -> Result<WitnessValue>,
    empty_auxiliary: fn() -> Auxiliary,
}

impl WitnessType {
    pub fn of<T: Provable>() -> Self {
        Self {
            name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            size_in_fields: T::size_in_fields(),
            decode: decode_erased::<T>,
            empty_auxiliary: T::empty_auxiliary,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size_in_fields(&self) -> usize {
        self.size_in_fields
    }

    pub fn is<T: Provable>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Decode a value of this type
    pub fn from_fields(&self, fields: &[Scalar], aux: &Auxiliary) -> Result<WitnessValue> {
        (self.decode)(fields, aux)
    }

    /// Decode a value of this type with its default auxiliary data
    pub fn from_fields_default(&self, fields: &[Scalar]) -> Result<WitnessValue> {
        (self.decode)(fields, &(self.empty_auxiliary)())
    }

    /// The value decoded from all-zero fields
    pub fn empty_value(&self) -> Result<WitnessValue> {
        self.from_fields_default(&vec![Scalar::zero(); self.size_in_fields])
    }

    /// Fail unless `value` is of this type
    pub fn check(&self, value: &WitnessValue) -> Result<()> {
        if value.type_id != self.type_id {
            return Err(ZkProgramError::TypeMismatch {
                expected: self.name.to_string(),
                actual: value.type_name.to_string(),
            });
        }
        Ok(())
    }
}

impl PartialEq for WitnessType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for WitnessType {}

impl fmt::Debug for WitnessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WitnessType")
            .field("name", &self.name)
            .field("size_in_fields", &self.size_in_fields)
            .finish()
    }
}

/// Type-erased value of a [`Provable`] type
#[derive(Clone)]
pub struct WitnessValue {
    type_name: &'static str,
    type_id: TypeId,
    fields: Vec<Scalar>,
    aux: Auxiliary,
    value: Rc<dyn Any>,
}

impl WitnessValue {
    pub fn new<T: Provable>(value: T) -> Self {
        Self {
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            fields: value.to_fields(),
            aux: value.to_auxiliary(),
            value: Rc::new(value),
        }
    }

    /// Typed copy of the value
    pub fn get<T: Provable>(&self) -> Result<T> {
        self.value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ZkProgramError::TypeMismatch {
                expected: type_name::<T>().to_string(),
                actual: self.type_name.to_string(),
            })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn to_fields(&self) -> &[Scalar] {
        &self.fields
    }

    pub fn to_auxiliary(&self) -> &Auxiliary {
        &self.aux
    }
}

impl PartialEq for WitnessValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.fields == other.fields && self.aux == other.aux
    }
}

impl fmt::Debug for WitnessValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WitnessValue")
            .field("type", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}
