use super::{Address, Memory};
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Object tree, attributes and properties
///
/// Version 3 objects are 9 bytes with byte sized links and 32 attributes.
/// Later versions use 14 byte objects with word links and 48 attributes.
/// The property defaults table comes first, 31 or 63 words.

#[derive(Debug, Clone, Copy)]
pub struct ObjectTable {
    version: u8,
    address: Address,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Link {
    Parent,
    Sibling,
    Child,
}

impl ObjectTable {
    pub fn new(version: u8, address: Address) -> ObjectTable {
        ObjectTable { version, address }
    }

    fn small(&self) -> bool {
        self.version <= 3
    }

    fn entry(&self, object: u16) -> Result<Address> {
        let max = if self.small() { 255 } else { 65535 };
        if object == 0 || object > max {
            return Err(error!(BadOperands; "OBJECT {}", object));
        }
        Ok(if self.small() {
            self.address + 31 * 2 + 9 * (object as Address - 1)
        } else {
            self.address + 63 * 2 + 14 * (object as Address - 1)
        })
    }

    fn link(&self, memory: &Memory, object: u16, link: Link) -> Result<u16> {
        let entry = self.entry(object)?;
        if self.small() {
            Ok(memory.read_byte(entry + 4 + link as Address)? as u16)
        } else {
            memory.read_word(entry + 6 + 2 * link as Address)
        }
    }

    fn set_link(&self, memory: &mut Memory, object: u16, link: Link, value: u16) -> Result<()> {
        let entry = self.entry(object)?;
        if self.small() {
            memory.write_byte(entry + 4 + link as Address, value as u8)
        } else {
            memory.write_word(entry + 6 + 2 * link as Address, value)
        }
    }

    pub fn parent(&self, memory: &Memory, object: u16) -> Result<u16> {
        self.link(memory, object, Link::Parent)
    }

    pub fn sibling(&self, memory: &Memory, object: u16) -> Result<u16> {
        self.link(memory, object, Link::Sibling)
    }

    pub fn child(&self, memory: &Memory, object: u16) -> Result<u16> {
        self.link(memory, object, Link::Child)
    }

    fn attribute_location(&self, object: u16, attribute: u16) -> Result<(Address, u8)> {
        let limit = if self.small() { 32 } else { 48 };
        if attribute >= limit {
            return Err(error!(BadOperands; "ATTRIBUTE {}", attribute));
        }
        let entry = self.entry(object)?;
        Ok((
            entry + attribute as Address / 8,
            0x80 >> (attribute % 8),
        ))
    }

    pub fn test_attribute(&self, memory: &Memory, object: u16, attribute: u16) -> Result<bool> {
        let (at, mask) = self.attribute_location(object, attribute)?;
        Ok(memory.read_byte(at)? & mask != 0)
    }

    pub fn set_attribute(
        &self,
        memory: &mut Memory,
        object: u16,
        attribute: u16,
        on: bool,
    ) -> Result<()> {
        let (at, mask) = self.attribute_location(object, attribute)?;
        let byte = memory.read_byte(at)?;
        memory.write_byte(at, if on { byte | mask } else { byte & !mask })
    }

    /// Detach an object from its parent.
    pub fn remove(&self, memory: &mut Memory, object: u16) -> Result<()> {
        let parent = self.parent(memory, object)?;
        if parent == 0 {
            return Ok(());
        }
        let sibling = self.sibling(memory, object)?;
        let first = self.child(memory, parent)?;
        if first == object {
            self.set_link(memory, parent, Link::Child, sibling)?;
        } else {
            let mut prev = first;
            loop {
                if prev == 0 {
                    return Err(error!(CorruptImage; "OBJECT {} NOT AMONG CHILDREN OF {}", object, parent));
                }
                let next = self.sibling(memory, prev)?;
                if next == object {
                    self.set_link(memory, prev, Link::Sibling, sibling)?;
                    break;
                }
                prev = next;
            }
        }
        self.set_link(memory, object, Link::Parent, 0)?;
        self.set_link(memory, object, Link::Sibling, 0)
    }

    /// Make `object` the first child of `destination`.
    pub fn insert(&self, memory: &mut Memory, object: u16, destination: u16) -> Result<()> {
        self.remove(memory, object)?;
        let first = self.child(memory, destination)?;
        self.set_link(memory, object, Link::Sibling, first)?;
        self.set_link(memory, object, Link::Parent, destination)?;
        self.set_link(memory, destination, Link::Child, object)
    }

    fn properties(&self, memory: &Memory, object: u16) -> Result<Address> {
        let entry = self.entry(object)?;
        let at = if self.small() { entry + 7 } else { entry + 12 };
        Ok(memory.read_word(at)? as Address)
    }

    /// Address of the object's short name Z-string.
    pub fn name(&self, memory: &Memory, object: u16) -> Result<Address> {
        Ok(self.properties(memory, object)? + 1)
    }

    /// Whether the short name is empty.
    pub fn name_is_empty(&self, memory: &Memory, object: u16) -> Result<bool> {
        let table = self.properties(memory, object)?;
        Ok(memory.read_byte(table)? == 0)
    }

    /// Number, data address and length of the property whose
    /// header is at `at`. A zero number ends the list.
    fn property_header(&self, memory: &Memory, at: Address) -> Result<(u16, Address, usize)> {
        let size = memory.read_byte(at)?;
        if self.small() {
            let number = (size & 0x1f) as u16;
            Ok((number, at + 1, (size >> 5) as usize + 1))
        } else if size & 0x80 != 0 {
            let number = (size & 0x3f) as u16;
            let len = match memory.read_byte(at + 1)? & 0x3f {
                0 => 64,
                len => len as usize,
            };
            Ok((number, at + 2, len))
        } else {
            let number = (size & 0x3f) as u16;
            let len = if size & 0x40 != 0 { 2 } else { 1 };
            Ok((number, at + 1, len))
        }
    }

    fn first_property(&self, memory: &Memory, object: u16) -> Result<Address> {
        let table = self.properties(memory, object)?;
        let name_words = memory.read_byte(table)? as Address;
        Ok(table + 1 + 2 * name_words)
    }

    /// Data address and length of a property, if the object has it.
    fn find(&self, memory: &Memory, object: u16, property: u16) -> Result<Option<(Address, usize)>> {
        if property == 0 {
            return Ok(None);
        }
        let mut at = self.first_property(memory, object)?;
        loop {
            let (number, data, len) = self.property_header(memory, at)?;
            if number == property {
                return Ok(Some((data, len)));
            }
            // Properties are in descending order.
            if number == 0 || number < property {
                return Ok(None);
            }
            at = data + len;
        }
    }

    fn default(&self, memory: &Memory, property: u16) -> Result<u16> {
        let limit = if self.small() { 31 } else { 63 };
        if property == 0 || property > limit {
            return Err(error!(BadOperands; "PROPERTY {}", property));
        }
        memory.read_word(self.address + 2 * (property as Address - 1))
    }

    /// Property value, or the default, with the length of the property
    /// it came from. The length is zero for a default. Only one and two
    /// byte properties have a value; longer ones read as their first word.
    pub fn get_property(&self, memory: &Memory, object: u16, property: u16) -> Result<(u16, usize)> {
        match self.find(memory, object, property)? {
            Some((data, 1)) => Ok((memory.read_byte(data)? as u16, 1)),
            Some((data, len)) => Ok((memory.read_word(data)?, len)),
            None => Ok((self.default(memory, property)?, 0)),
        }
    }

    /// Returns false if the object lacks the property.
    pub fn put_property(
        &self,
        memory: &mut Memory,
        object: u16,
        property: u16,
        value: u16,
    ) -> Result<bool> {
        match self.find(memory, object, property)? {
            Some((data, 1)) => memory.write_byte(data, value as u8).map(|_| true),
            Some((data, _)) => memory.write_word(data, value).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn property_address(&self, memory: &Memory, object: u16, property: u16) -> Result<u16> {
        Ok(match self.find(memory, object, property)? {
            Some((data, _)) => data as u16,
            None => 0,
        })
    }

    /// Length of the property whose data starts at `data`.
    pub fn property_length(&self, memory: &Memory, data: Address) -> Result<u16> {
        if data == 0 {
            return Ok(0);
        }
        let size = memory.read_byte(data - 1)?;
        Ok(if self.small() {
            (size >> 5) as u16 + 1
        } else if size & 0x80 != 0 {
            match size & 0x3f {
                0 => 64,
                len => len as u16,
            }
        } else if size & 0x40 != 0 {
            2
        } else {
            1
        })
    }

    /// The property after `property`, or the first one when it is zero.
    /// `None` when the object lacks `property`.
    pub fn next_property(&self, memory: &Memory, object: u16, property: u16) -> Result<Option<u16>> {
        let at = if property == 0 {
            self.first_property(memory, object)?
        } else {
            match self.find(memory, object, property)? {
                Some((data, len)) => data + len,
                None => return Ok(None),
            }
        };
        Ok(Some(self.property_header(memory, at)?.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Objects 1 (parent of 2 and 3) at 0x40, properties from 0x100.
    fn v3_memory() -> Memory {
        let mut image = vec![0u8; 0x200];
        image[0] = 3;
        image[0x0e] = 0x01;
        image[0x0f] = 0x80;
        // default for property 5
        image[0x40 + 8] = 0x12;
        image[0x40 + 9] = 0x34;
        let objects = 0x40 + 62;
        let props = [0x100u16, 0x110, 0x120];
        let links = [(0u8, 0u8, 2u8), (1, 3, 0), (1, 0, 0)];
        for i in 0..3 {
            let e = objects + 9 * i;
            image[e + 4] = links[i].0;
            image[e + 5] = links[i].1;
            image[e + 6] = links[i].2;
            image[e + 7] = (props[i] >> 8) as u8;
            image[e + 8] = props[i] as u8;
        }
        image[objects] = 0x80; // attribute 0 on object 1
        // object 1: empty name, property 7 (2 bytes), property 3 (1 byte), end
        image[0x100..0x107].copy_from_slice(&[0, 0x27, 0xab, 0xcd, 0x03, 0x42, 0]);
        image[0x110] = 0;
        image[0x120] = 0;
        Memory::new(image).unwrap()
    }

    #[test]
    fn test_tree() {
        let mut m = v3_memory();
        let t = ObjectTable::new(3, 0x40);
        assert_eq!(t.child(&m, 1).unwrap(), 2);
        assert_eq!(t.sibling(&m, 2).unwrap(), 3);
        t.remove(&mut m, 3).unwrap();
        assert_eq!(t.sibling(&m, 2).unwrap(), 0);
        assert_eq!(t.parent(&m, 3).unwrap(), 0);
        t.insert(&mut m, 3, 1).unwrap();
        assert_eq!(t.child(&m, 1).unwrap(), 3);
        assert_eq!(t.sibling(&m, 3).unwrap(), 2);
        t.insert(&mut m, 2, 3).unwrap();
        assert_eq!(t.child(&m, 3).unwrap(), 2);
        assert_eq!(t.sibling(&m, 3).unwrap(), 0);
        assert!(t.parent(&m, 0).is_err());
    }

    #[test]
    fn test_attributes() {
        let mut m = v3_memory();
        let t = ObjectTable::new(3, 0x40);
        assert!(t.test_attribute(&m, 1, 0).unwrap());
        assert!(!t.test_attribute(&m, 1, 31).unwrap());
        t.set_attribute(&mut m, 1, 31, true).unwrap();
        assert!(t.test_attribute(&m, 1, 31).unwrap());
        t.set_attribute(&mut m, 1, 0, false).unwrap();
        assert!(!t.test_attribute(&m, 1, 0).unwrap());
        assert!(t.test_attribute(&m, 1, 32).is_err());
    }

    #[test]
    fn test_properties() {
        let mut m = v3_memory();
        let t = ObjectTable::new(3, 0x40);
        assert_eq!(t.get_property(&m, 1, 7).unwrap(), (0xabcd, 2));
        assert_eq!(t.get_property(&m, 1, 3).unwrap(), (0x42, 1));
        assert_eq!(t.get_property(&m, 1, 5).unwrap(), (0x1234, 0));
        assert!(t.put_property(&mut m, 1, 3, 0x199).unwrap());
        assert_eq!(t.get_property(&m, 1, 3).unwrap().0, 0x99);
        assert!(!t.put_property(&mut m, 1, 4, 1).unwrap());
        let addr = t.property_address(&m, 1, 7).unwrap();
        assert_eq!(addr, 0x102);
        assert_eq!(t.property_length(&m, addr as Address).unwrap(), 2);
        assert_eq!(t.property_length(&m, 0).unwrap(), 0);
        assert_eq!(t.next_property(&m, 1, 0).unwrap(), Some(7));
        assert_eq!(t.next_property(&m, 1, 7).unwrap(), Some(3));
        assert_eq!(t.next_property(&m, 1, 3).unwrap(), Some(0));
        assert_eq!(t.next_property(&m, 1, 4).unwrap(), None);
        assert!(t.name_is_empty(&m, 1).unwrap());
    }

    #[test]
    fn test_v4_two_byte_header() {
        let mut image = vec![0u8; 0x300];
        image[0] = 5;
        image[0x0e] = 0x02;
        let objects = 0x40 + 126;
        image[objects + 12] = 0x01;
        image[objects + 13] = 0x00;
        // name, property 20 with 0x80 header and length 0 meaning 64, end
        image[0x100] = 0;
        image[0x101] = 0x80 | 20;
        image[0x102] = 0x80;
        image[0x103 + 64] = 0;
        let m = Memory::new(image).unwrap();
        let t = ObjectTable::new(5, 0x40);
        let addr = t.property_address(&m, 1, 20).unwrap();
        assert_eq!(addr, 0x103);
        assert_eq!(t.property_length(&m, 0x103).unwrap(), 64);
        assert_eq!(t.next_property(&m, 1, 20).unwrap(), Some(0));
    }
}
