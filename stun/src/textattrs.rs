use crate::error::Result;
use crate::message::{Message, ATTR_NONCE, ATTR_REALM, ATTR_SOFTWARE, ATTR_USERNAME};

/// Textual attributes (USERNAME, REALM, NONCE, SOFTWARE).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAttribute {
    pub attr: u16,
    pub text: String,
}

impl TextAttribute {
    pub fn new(attr: u16, text: String) -> Self {
        TextAttribute { attr, text }
    }

    pub fn add_to(&self, m: &mut Message) {
        m.add(self.attr, self.text.as_bytes());
    }

    pub fn get_from_as(m: &Message, attr: u16) -> Result<TextAttribute> {
        let value = m.get(attr)?;
        Ok(TextAttribute {
            attr,
            text: String::from_utf8_lossy(value).into_owned(),
        })
    }
}

pub struct Username;
impl Username {
    pub fn add_to(m: &mut Message, username: &str) {
        TextAttribute::new(ATTR_USERNAME, username.to_owned()).add_to(m);
    }
    pub fn get_from(m: &Message) -> Result<String> {
        Ok(TextAttribute::get_from_as(m, ATTR_USERNAME)?.text)
    }
}

pub struct Realm;
impl Realm {
    pub fn get_from(m: &Message) -> Result<String> {
        Ok(TextAttribute::get_from_as(m, ATTR_REALM)?.text)
    }
}

pub struct Nonce;
impl Nonce {
    pub fn get_from(m: &Message) -> Result<String> {
        Ok(TextAttribute::get_from_as(m, ATTR_NONCE)?.text)
    }
}

pub struct Software;
impl Software {
    pub fn add_to(m: &mut Message, software: &str) {
        TextAttribute::new(ATTR_SOFTWARE, software.to_owned()).add_to(m);
    }
}
