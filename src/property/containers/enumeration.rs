use crate::error::StoreError;
use crate::property::containers::{IntValueContainer, ValueContainer};
use crate::property::{EnumDomain, PropertyDefinition, PropertyValue, PropertyValueType};

/// Enum values stored as ordinals into their [`EnumDomain`].
#[derive(Debug, Clone)]
pub struct EnumContainer {
    domain: EnumDomain,
    ordinals: IntValueContainer,
}

impl EnumContainer {
    #[must_use]
    pub fn domain(&self) -> &EnumDomain {
        &self.domain
    }

    fn ordinal_of(&self, value: &PropertyValue) -> Result<i64, StoreError> {
        let mismatch = || PropertyValueType::Enum(self.domain.clone()).mismatch(value);
        match value {
            PropertyValue::Enum(variant) => self
                .domain
                .ordinal(variant)
                .and_then(|ordinal| i64::try_from(ordinal).ok())
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        }
    }
}

impl ValueContainer for EnumContainer {
    const MANAGER_NAME: &'static str = "EnumPropertyManager";

    fn from_definition(
        definition: &PropertyDefinition,
        initial_size: usize,
    ) -> Result<Self, StoreError> {
        let PropertyValueType::Enum(domain) = definition.value_type() else {
            return Err(StoreError::PropertyDefinitionImproperType {
                manager: Self::MANAGER_NAME,
                found: definition.value_type().clone(),
            });
        };
        let default_value = definition
            .default_value()
            .ok_or(StoreError::PropertyDefinitionMissingDefault(
                Self::MANAGER_NAME,
            ))?;
        let mut container = Self {
            domain: domain.clone(),
            ordinals: IntValueContainer::new(0, 0),
        };
        let default_ordinal = container.ordinal_of(default_value)?;
        container.ordinals = IntValueContainer::new(default_ordinal, initial_size);
        Ok(container)
    }

    fn get_value(&self, slot: usize) -> Option<PropertyValue> {
        let ordinal = usize::try_from(self.ordinals.get(slot)).ok()?;
        self.domain
            .variant(ordinal)
            .map(|variant| PropertyValue::Enum(variant.to_string()))
    }

    fn set_value(&mut self, slot: usize, value: &PropertyValue) -> Result<(), StoreError> {
        let ordinal = self.ordinal_of(value)?;
        self.ordinals.set(slot, ordinal);
        Ok(())
    }

    fn reserve(&mut self, additional: usize) {
        self.ordinals.reserve(additional);
    }
}
