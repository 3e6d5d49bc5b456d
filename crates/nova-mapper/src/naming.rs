//! Name comparison for members and name transformation for enum values.

use heck::{
    ToKebabCase, ToLowerCamelCase, ToPascalCase, ToShoutyKebabCase, ToShoutySnakeCase,
    ToSnakeCase,
};
use nova_mapper_config::{EnumNamingStrategy, PropertyNameMappingStrategy};
use nova_mapper_types::EnumMemberDef;

/// How well two member names correspond.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NameMatch {
    /// Identical names.
    Exact,
    /// Equal after applying the naming strategy to both names.
    Transformed,
}

pub fn match_names(
    strategy: PropertyNameMappingStrategy,
    source: &str,
    target: &str,
) -> Option<NameMatch> {
    if source == target {
        return Some(NameMatch::Exact);
    }
    let equal = match strategy {
        PropertyNameMappingStrategy::CaseSensitive => false,
        PropertyNameMappingStrategy::CaseInsensitive => source.eq_ignore_ascii_case(target),
        PropertyNameMappingStrategy::SnakeCase => source.to_snake_case() == target.to_snake_case(),
        PropertyNameMappingStrategy::UpperSnakeCase => {
            source.to_shouty_snake_case() == target.to_shouty_snake_case()
        }
    };
    equal.then_some(NameMatch::Transformed)
}

/// Comparison key used when splitting a flattened name into member prefixes.
///
/// Case-sensitive matching keeps names as they are; every other strategy compares lowercase
/// names with word separators removed, so `value_id`, `ValueId` and `VALUE_ID` share a key.
pub fn flatten_key(strategy: PropertyNameMappingStrategy, name: &str) -> String {
    match strategy {
        PropertyNameMappingStrategy::CaseSensitive => name.to_string(),
        _ => name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect(),
    }
}

/// The string an enum member maps to and from under `strategy`.
pub fn enum_member_name(strategy: EnumNamingStrategy, member: &EnumMemberDef) -> String {
    let name = member.name.as_str();
    match strategy {
        EnumNamingStrategy::MemberName => name.to_string(),
        EnumNamingStrategy::CamelCase => name.to_lower_camel_case(),
        EnumNamingStrategy::PascalCase => name.to_pascal_case(),
        EnumNamingStrategy::SnakeCase => name.to_snake_case(),
        EnumNamingStrategy::UpperSnakeCase => name.to_shouty_snake_case(),
        EnumNamingStrategy::KebabCase => name.to_kebab_case(),
        EnumNamingStrategy::UpperKebabCase => name.to_shouty_kebab_case(),
        EnumNamingStrategy::ComponentModelDescription => member
            .description
            .clone()
            .unwrap_or_else(|| name.to_string()),
        EnumNamingStrategy::SerializationEnumMember => member
            .serialization_name
            .clone()
            .unwrap_or_else(|| name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_beats_strategy() {
        use PropertyNameMappingStrategy as S;
        assert_eq!(match_names(S::SnakeCase, "Id", "Id"), Some(NameMatch::Exact));
        assert_eq!(
            match_names(S::SnakeCase, "first_name", "FirstName"),
            Some(NameMatch::Transformed)
        );
        assert_eq!(
            match_names(S::UpperSnakeCase, "FIRST_NAME", "FirstName"),
            Some(NameMatch::Transformed)
        );
        assert_eq!(
            match_names(S::CaseInsensitive, "firstname", "FirstName"),
            Some(NameMatch::Transformed)
        );
        assert_eq!(match_names(S::CaseSensitive, "firstName", "FirstName"), None);
    }

    #[test]
    fn flatten_keys_ignore_separators() {
        use PropertyNameMappingStrategy as S;
        assert_eq!(flatten_key(S::SnakeCase, "value_id"), flatten_key(S::SnakeCase, "ValueId"));
        assert_ne!(
            flatten_key(S::CaseSensitive, "valueId"),
            flatten_key(S::CaseSensitive, "ValueId")
        );
    }

    #[test]
    fn enum_naming_strategies() {
        let mut member = EnumMemberDef::new("DarkRed", 1);
        assert_eq!(enum_member_name(EnumNamingStrategy::CamelCase, &member), "darkRed");
        assert_eq!(enum_member_name(EnumNamingStrategy::SnakeCase, &member), "dark_red");
        assert_eq!(
            enum_member_name(EnumNamingStrategy::UpperKebabCase, &member),
            "DARK-RED"
        );
        assert_eq!(
            enum_member_name(EnumNamingStrategy::ComponentModelDescription, &member),
            "DarkRed"
        );
        member.description = Some("Dark red".to_string());
        assert_eq!(
            enum_member_name(EnumNamingStrategy::ComponentModelDescription, &member),
            "Dark red"
        );
    }
}
