//! Per-entity attribute maps (C4 input) grounded in the `attr_map` table in
//! the original relational store, which keys SQL column expressions by
//! `(attr, subattr, uri)`.

use std::collections::HashMap;

use crate::filter::{AttrEntry, AttributeMap};

pub fn user_attribute_map() -> AttributeMap {
    let mut m: AttributeMap = HashMap::new();
    m.insert("id", AttrEntry::Column("users.id".to_string()));
    m.insert("username", AttrEntry::Column("users.user_name".to_string()));
    m.insert(
        "externalid",
        AttrEntry::Column("users.external_id".to_string()),
    );
    m.insert(
        "displayname",
        AttrEntry::Column("users.display_name".to_string()),
    );
    m.insert("active", AttrEntry::Column("users.active".to_string()));
    m.insert("locale", AttrEntry::Column("users.locale".to_string()));
    m.insert(
        "name.givenname",
        AttrEntry::Column("users.given_name".to_string()),
    );
    m.insert(
        "name.familyname",
        AttrEntry::Column("users.family_name".to_string()),
    );
    m.insert(
        "emails",
        AttrEntry::Membership {
            join_table: "user_emails".to_string(),
            parent_column: "user_id".to_string(),
            member_column: "value".to_string(),
        },
    );
    m.insert(
        "groups",
        AttrEntry::Membership {
            join_table: "users_groups".to_string(),
            parent_column: "user_id".to_string(),
            member_column: "group_id".to_string(),
        },
    );
    m
}

pub fn group_attribute_map() -> AttributeMap {
    let mut m: AttributeMap = HashMap::new();
    m.insert("id", AttrEntry::Column("groups.id".to_string()));
    m.insert(
        "displayname",
        AttrEntry::Column("groups.display_name".to_string()),
    );
    m.insert(
        "members",
        AttrEntry::Membership {
            join_table: "users_groups".to_string(),
            parent_column: "group_id".to_string(),
            member_column: "user_id".to_string(),
        },
    );
    m
}
