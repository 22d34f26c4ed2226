//! Security utilities for Salesforce API operations.
//!
//! Identifiers that end up inside SOQL text and values that end up inside a
//! SOAP envelope both come from user-editable files, so they go through
//! this module first.
//!
//! ```rust
//! use busbar_sf_client::security::soql;
//!
//! let query = soql::build_select("Account", &["Id", "Name"]);
//! assert_eq!(query.as_deref(), Some("SELECT Id, Name FROM Account"));
//!
//! assert_eq!(soql::build_select("Account", &["Id", "Name; DELETE"]), None);
//! ```

/// SOQL identifier validation.
pub mod soql {
    /// Validate that a field name contains only safe characters.
    ///
    /// Field names must start with a letter and contain only ASCII
    /// alphanumerics and underscores (which covers the `__c` / `__r`
    /// suffixes of custom fields and relationships).
    ///
    /// ```rust
    /// use busbar_sf_client::security::soql;
    ///
    /// assert!(soql::is_safe_field_name("Account"));
    /// assert!(soql::is_safe_field_name("Custom_Field__c"));
    /// assert!(!soql::is_safe_field_name("Bad'; DROP TABLE--"));
    /// ```
    #[must_use]
    pub fn is_safe_field_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {}
            _ => return false,
        }
        chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    }

    /// Validate that a SObject name is safe.
    ///
    /// SObject names follow the same rules as field names.
    #[must_use]
    pub fn is_safe_sobject_name(name: &str) -> bool {
        is_safe_field_name(name)
    }

    /// Build `SELECT f1, f2, ... FROM SObject`, keeping field order.
    ///
    /// Returns `None` if the field list is empty or any identifier fails
    /// validation. Unsafe fields are never dropped silently, since that
    /// would change the shape of the result set.
    #[must_use]
    pub fn build_select(sobject: &str, fields: &[&str]) -> Option<String> {
        if fields.is_empty()
            || !is_safe_sobject_name(sobject)
            || !fields.iter().all(|f| is_safe_field_name(f))
        {
            return None;
        }
        Some(format!("SELECT {} FROM {}", fields.join(", "), sobject))
    }
}

/// XML escaping utilities for the SOAP login envelope.
pub mod xml {
    /// Escape a string for safe inclusion in XML content.
    ///
    /// ```rust
    /// use busbar_sf_client::security::xml;
    ///
    /// let safe = xml::escape("Hello <World> & 'Friends'");
    /// assert_eq!(safe, "Hello &lt;World&gt; &amp; &apos;Friends&apos;");
    /// ```
    #[must_use]
    pub fn escape(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 16);
        for ch in value.chars() {
            match ch {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&apos;"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }

    /// Reverse [`escape`] for text pulled out of a SOAP response.
    #[must_use]
    pub fn unescape(value: &str) -> String {
        value
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&")
    }
}
