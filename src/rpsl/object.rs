//! The RPSL object capability set the validators depend on.
//!
//! RPSL lexical parsing is out of scope for this crate (spec.md §1): an
//! embedder hands the validators already-parsed objects through
//! [`RpslObject`]. The trait is the capability interface called for in
//! spec.md §9's design notes ("break with a capability interface: the
//! validators only require the capability set enumerated in §3, not the
//! full object model") — it exposes exactly what `reference.rs`,
//! `auth.rs` and `rules.rs` read, nothing more.

use std::collections::HashMap;
use std::fmt;

use ipnet::IpNet;

use super::mntner::MntnerObject;

/// Discriminator for an RPSL object's class.
///
/// A closed set covering every class the validators special-case, plus
/// an escape hatch for classes that only ever need the generic
/// reference/auth treatment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Mntner,
    Person,
    Role,
    Route,
    Route6,
    AutNum,
    AsSet,
    RouteSet,
    AsBlock,
    FilterSet,
    PeeringSet,
    RtrSet,
    InetNum,
    Inet6Num,
    Other(String),
}

impl ObjectClass {
    /// Parse the RPSL class keyword (e.g. `"route6"`) into a class.
    pub fn parse(name: &str) -> Self {
        match name {
            "mntner" => Self::Mntner,
            "person" => Self::Person,
            "role" => Self::Role,
            "route" => Self::Route,
            "route6" => Self::Route6,
            "aut-num" => Self::AutNum,
            "as-set" => Self::AsSet,
            "route-set" => Self::RouteSet,
            "as-block" => Self::AsBlock,
            "filter-set" => Self::FilterSet,
            "peering-set" => Self::PeeringSet,
            "rtr-set" => Self::RtrSet,
            "inetnum" => Self::InetNum,
            "inet6num" => Self::Inet6Num,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Mntner => "mntner",
            Self::Person => "person",
            Self::Role => "role",
            Self::Route => "route",
            Self::Route6 => "route6",
            Self::AutNum => "aut-num",
            Self::AsSet => "as-set",
            Self::RouteSet => "route-set",
            Self::AsBlock => "as-block",
            Self::FilterSet => "filter-set",
            Self::PeeringSet => "peering-set",
            Self::RtrSet => "rtr-set",
            Self::InetNum => "inetnum",
            Self::Inet6Num => "inet6num",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Whether this class is one of the RPSL "set" classes, for which
    /// aut-num related-object authentication applies.
    pub fn is_set_class(&self) -> bool {
        matches!(
            self,
            Self::AsSet | Self::RouteSet | Self::FilterSet | Self::PeeringSet | Self::RtrSet
        )
    }

    pub fn is_route_class(&self) -> bool {
        matches!(self, Self::Route | Self::Route6)
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One outgoing strong reference field: the attribute it came from, the
/// object classes that may satisfy it, and the PKs it names.
#[derive(Debug, Clone)]
pub struct StrongReference {
    pub field_name: String,
    pub allowed_classes: Vec<ObjectClass>,
    pub referenced_pks: Vec<String>,
}

/// One `(object_class, attribute)` pair that can reference this object's
/// class — used to scope the inbound-reference query on delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReference {
    pub object_class: ObjectClass,
    pub attribute: String,
}

/// The read-only capability surface the validators use for every RPSL
/// object, regardless of class.
pub trait RpslObject: fmt::Debug {
    fn object_class(&self) -> &ObjectClass;
    fn pk(&self) -> &str;
    fn source(&self) -> &str;
    fn parsed_data(&self) -> &HashMap<String, Vec<String>>;

    /// Outgoing strong references this object carries.
    fn referred_strong_objects(&self) -> &[StrongReference];

    /// `(class, attribute)` pairs that could reference this object's
    /// class. Non-empty only for classes other objects can point at
    /// (mntner via `mnt-by`, person/role via `admin-c`/`tech-c`, etc).
    fn references_strong_inbound(&self) -> &[InboundReference];

    /// The AS-number segment of a set object's PK (e.g. `AS65000` out of
    /// `AS65000:AS-CUSTOMERS`), if this object is a set class and its PK
    /// carries one.
    fn pk_asn_segment(&self) -> Option<&str> {
        None
    }

    /// The covered IP prefix, for route/route6 objects.
    fn prefix(&self) -> Option<IpNet> {
        None
    }

    /// Convenience accessor for the `mnt-by` attribute, used by every
    /// auth check.
    fn mnt_by(&self) -> &[String] {
        static EMPTY: &[String] = &[];
        self.parsed_data().get("mnt-by").map(Vec::as_slice).unwrap_or(EMPTY)
    }
}

/// A non-maintainer RPSL object: route(6), person, role, aut-num, the
/// set classes, inet(6)num, and anything the caller didn't special-case.
#[derive(Debug, Clone)]
pub struct GenericRpslObject {
    pub object_class: ObjectClass,
    pub pk: String,
    pub source: String,
    pub parsed_data: HashMap<String, Vec<String>>,
    pub referred_strong: Vec<StrongReference>,
    pub references_strong_inbound: Vec<InboundReference>,
    pub pk_asn_segment: Option<String>,
    pub prefix: Option<IpNet>,
}

impl GenericRpslObject {
    pub fn new(object_class: ObjectClass, pk: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            object_class,
            pk: pk.into(),
            source: source.into(),
            parsed_data: HashMap::new(),
            referred_strong: Vec::new(),
            references_strong_inbound: Vec::new(),
            pk_asn_segment: None,
            prefix: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.parsed_data.insert(name.into(), values);
        self
    }

    pub fn with_strong_reference(
        mut self,
        field_name: impl Into<String>,
        allowed_classes: Vec<ObjectClass>,
        referenced_pks: Vec<String>,
    ) -> Self {
        self.referred_strong.push(StrongReference {
            field_name: field_name.into(),
            allowed_classes,
            referenced_pks,
        });
        self
    }

    pub fn with_inbound_reference(mut self, object_class: ObjectClass, attribute: impl Into<String>) -> Self {
        self.references_strong_inbound.push(InboundReference {
            object_class,
            attribute: attribute.into(),
        });
        self
    }

    pub fn with_pk_asn_segment(mut self, segment: impl Into<String>) -> Self {
        self.pk_asn_segment = Some(segment.into());
        self
    }

    pub fn with_prefix(mut self, prefix: IpNet) -> Self {
        self.prefix = Some(prefix);
        self
    }
}

impl RpslObject for GenericRpslObject {
    fn object_class(&self) -> &ObjectClass {
        &self.object_class
    }

    fn pk(&self) -> &str {
        &self.pk
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn parsed_data(&self) -> &HashMap<String, Vec<String>> {
        &self.parsed_data
    }

    fn referred_strong_objects(&self) -> &[StrongReference] {
        &self.referred_strong
    }

    fn references_strong_inbound(&self) -> &[InboundReference] {
        &self.references_strong_inbound
    }

    fn pk_asn_segment(&self) -> Option<&str> {
        self.pk_asn_segment.as_deref()
    }

    fn prefix(&self) -> Option<IpNet> {
        self.prefix
    }
}

/// Either of the two object shapes the validators handle: an ordinary
/// object, or a maintainer carrying authentication capabilities.
///
/// A sum type rather than a single trait-object bag so `AuthValidator`
/// can reach maintainer-only operations (`verify_auth`,
/// `has_dummy_auth_value`, ...) without runtime downcasting — the
/// object's class is known statically from which variant it is.
#[derive(Debug, Clone)]
pub enum RpslObjectHandle {
    Generic(GenericRpslObject),
    Mntner(MntnerObject),
}

impl RpslObjectHandle {
    pub fn as_mntner(&self) -> Option<&MntnerObject> {
        match self {
            Self::Mntner(m) => Some(m),
            Self::Generic(_) => None,
        }
    }

    pub fn as_mntner_mut(&mut self) -> Option<&mut MntnerObject> {
        match self {
            Self::Mntner(m) => Some(m),
            Self::Generic(_) => None,
        }
    }

    pub fn is_mntner(&self) -> bool {
        matches!(self, Self::Mntner(_))
    }
}

impl RpslObject for RpslObjectHandle {
    fn object_class(&self) -> &ObjectClass {
        match self {
            Self::Generic(o) => o.object_class(),
            Self::Mntner(m) => m.object_class(),
        }
    }

    fn pk(&self) -> &str {
        match self {
            Self::Generic(o) => o.pk(),
            Self::Mntner(m) => m.pk(),
        }
    }

    fn source(&self) -> &str {
        match self {
            Self::Generic(o) => o.source(),
            Self::Mntner(m) => m.source(),
        }
    }

    fn parsed_data(&self) -> &HashMap<String, Vec<String>> {
        match self {
            Self::Generic(o) => o.parsed_data(),
            Self::Mntner(m) => m.parsed_data(),
        }
    }

    fn referred_strong_objects(&self) -> &[StrongReference] {
        match self {
            Self::Generic(o) => o.referred_strong_objects(),
            Self::Mntner(m) => m.referred_strong_objects(),
        }
    }

    fn references_strong_inbound(&self) -> &[InboundReference] {
        match self {
            Self::Generic(o) => o.references_strong_inbound(),
            Self::Mntner(m) => m.references_strong_inbound(),
        }
    }

    fn pk_asn_segment(&self) -> Option<&str> {
        match self {
            Self::Generic(o) => o.pk_asn_segment(),
            Self::Mntner(m) => m.pk_asn_segment(),
        }
    }

    fn prefix(&self) -> Option<IpNet> {
        match self {
            Self::Generic(o) => o.prefix(),
            Self::Mntner(m) => m.prefix(),
        }
    }
}

impl From<GenericRpslObject> for RpslObjectHandle {
    fn from(value: GenericRpslObject) -> Self {
        Self::Generic(value)
    }
}

impl From<MntnerObject> for RpslObjectHandle {
    fn from(value: MntnerObject) -> Self {
        Self::Mntner(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_class_round_trips_through_str() {
        for (name, class) in [
            ("route6", ObjectClass::Route6),
            ("as-set", ObjectClass::AsSet),
            ("inetnum", ObjectClass::InetNum),
        ] {
            assert_eq!(ObjectClass::parse(name), class);
            assert_eq!(class.as_str(), name);
        }
    }

    #[test]
    fn unknown_class_falls_back_to_other() {
        let class = ObjectClass::parse("irt");
        assert_eq!(class, ObjectClass::Other("irt".to_string()));
    }

    #[test]
    fn set_and_route_class_predicates() {
        assert!(ObjectClass::AsSet.is_set_class());
        assert!(!ObjectClass::Route.is_set_class());
        assert!(ObjectClass::Route6.is_route_class());
        assert!(!ObjectClass::AutNum.is_route_class());
    }

    #[test]
    fn generic_object_exposes_mnt_by() {
        let obj = GenericRpslObject::new(ObjectClass::Route, "192.0.2.0/24", "TEST")
            .with_attribute("mnt-by", vec!["TEST-MNT".to_string()]);
        assert_eq!(obj.mnt_by(), &["TEST-MNT".to_string()]);
    }
}
