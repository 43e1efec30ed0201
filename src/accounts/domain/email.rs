use semval::prelude::*;

/// An email address used to look up an account.
///
/// Account lookups use the normalized form of the address: the domain is
/// case-insensitive and gets lowercased, while the local part is preserved
/// as provided. The same normalization must be applied when an address is
/// stored so the two forms can never drift apart.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Email {
    provided: String,
    normalized: String,
}

impl Email {
    /// Create an unvalidated email.
    ///
    /// Useful when constructing an object that contains an email but has not
    /// been validated yet.
    pub fn unvalidated(address: String) -> Self {
        // Addresses may contain multiple "@" symbols. The last one delimits
        // the local part from the domain.
        let normalized = match address.rsplit_once('@') {
            Some((local_part, domain)) => format!("{}@{}", local_part, domain.to_lowercase()),
            None => address.clone(),
        };

        Self {
            provided: address,
            normalized,
        }
    }

    pub fn address(&self) -> &str {
        &self.provided
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    fn has_domain(&self) -> bool {
        if let Some(index) = self.provided.rfind('@') {
            index < self.provided.len() - 1
        } else {
            false
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum EmailInvalidity {
    /// The address does not have a domain portion.
    MissingDomain,

    /// The address is missing the `@` symbol separating the local and domain
    /// parts.
    MissingSeparator,
}

impl Validate for Email {
    type Invalidity = EmailInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(
                !self.provided.contains('@'),
                EmailInvalidity::MissingSeparator,
            )
            .invalidate_if(!self.has_domain(), EmailInvalidity::MissingDomain)
            .into()
    }
}

impl ValidatedFrom<&str> for Email {
    fn validated_from(from: &str) -> ValidatedResult<Self> {
        let into = Self::unvalidated(from.to_owned());

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}
