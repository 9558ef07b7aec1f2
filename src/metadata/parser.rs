//! CSDL metadata parser
//!
//! Reads the `$metadata` document into entity sets and entity types. Only
//! `EntityType`, `Key/PropertyRef`, `Property` and `EntitySet` are read;
//! everything else is skipped.

use super::types::{MetadataDocument, PropertyDescriptor, ResourceDescriptor, TypeDescriptor};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// Base-type chains longer than this are treated as cycles
const MAX_BASE_DEPTH: usize = 16;

/// Parse a CSDL metadata document
pub fn parse_metadata(xml: &str) -> Result<MetadataDocument> {
    let xml = xml.trim();
    if !xml.starts_with('<') {
        return Err(Error::xml("Input does not appear to be XML"));
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut state = ParseState::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => state.open(&e, false)?,
            Ok(Event::Empty(e)) => state.open(&e, true)?,
            Ok(Event::End(e)) => state.close(e.local_name().as_ref()),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::xml(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    let mut doc = state.doc;
    inherit_keys(&mut doc.types);
    Ok(doc)
}

#[derive(Default)]
struct ParseState {
    doc: MetadataDocument,
    current: Option<TypeDescriptor>,
    in_key: bool,
}

impl ParseState {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        match e.local_name().as_ref() {
            b"EntityType" => {
                let ty = TypeDescriptor {
                    type_name: attribute(e, "Name")?.unwrap_or_default(),
                    base_type: attribute(e, "BaseType")?.map(|b| strip_namespace(&b).to_string()),
                    ..TypeDescriptor::default()
                };
                if empty {
                    self.doc.types.insert(ty.type_name.clone(), ty);
                } else {
                    self.current = Some(ty);
                }
            }
            b"Key" => self.in_key = !empty,
            b"PropertyRef" if self.in_key => {
                if let (Some(ty), Some(name)) = (self.current.as_mut(), attribute(e, "Name")?) {
                    ty.primary_key_property.get_or_insert(name);
                }
            }
            b"Property" => {
                if let Some(ty) = self.current.as_mut() {
                    if let Some(name) = attribute(e, "Name")? {
                        ty.properties.push(PropertyDescriptor {
                            name,
                            type_name: attribute(e, "Type")?.unwrap_or_default(),
                        });
                    }
                }
            }
            b"EntitySet" => {
                if let Some(name) = attribute(e, "Name")? {
                    let entity_type = attribute(e, "EntityType")?.unwrap_or_default();
                    self.doc.resources.push(ResourceDescriptor {
                        name,
                        underlying_type_name: strip_namespace(&entity_type).to_string(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, local_name: &[u8]) {
        match local_name {
            b"EntityType" => {
                if let Some(ty) = self.current.take() {
                    self.doc.types.insert(ty.type_name.clone(), ty);
                }
            }
            b"Key" => self.in_key = false,
            _ => {}
        }
    }
}

/// Read an attribute by local name, unescaped
fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::xml(err.to_string()))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| Error::xml(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// `Microsoft.Dynamics.CRM.account` -> `account`
pub fn strip_namespace(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Give key-less types the key of their nearest keyed base type
fn inherit_keys(types: &mut HashMap<String, TypeDescriptor>) {
    let inherited: Vec<(String, String)> = types
        .values()
        .filter(|t| t.primary_key_property.is_none())
        .filter_map(|t| inherited_key(types, t).map(|k| (t.type_name.clone(), k)))
        .collect();

    for (name, key) in inherited {
        if let Some(ty) = types.get_mut(&name) {
            ty.primary_key_property = Some(key);
        }
    }
}

fn inherited_key(types: &HashMap<String, TypeDescriptor>, ty: &TypeDescriptor) -> Option<String> {
    let mut base = ty.base_type.as_deref();
    for _ in 0..MAX_BASE_DEPTH {
        let parent = types.get(base?)?;
        if let Some(key) = &parent.primary_key_property {
            return Some(key.clone());
        }
        base = parent.base_type.as_deref();
    }
    None
}
