//! Hand-maintained German label → English key table for the VIDEX
//! short-stay (Schengen) application form.
//!
//! German label text is the only join key the form offers. The generator
//! validates every entry against the live DOM; when the form drifts, this
//! table is edited and `FORM_MAP_VERSION` bumped.

use std::collections::HashSet;

use crate::schema::condition::Condition;

pub const FORM_MAP_VERSION: &str = "2026.3";

pub const VIDEX_FORM_URL: &str =
    "https://videx.diplo.de/videx/visum-erfassung/videx-kurzfristiger-aufenthalt";

/// Canonical English value paired with the exact on-form German option text.
pub type OptionPair = (&'static str, &'static str);

// ============================================================================
// Table model
// ============================================================================

#[derive(Debug, Clone)]
pub struct MapEntry {
    /// Local key; children are namespaced under their parent at generation
    pub key: &'static str,
    /// German label (for groups: the fieldset legend)
    pub label: &'static str,
    pub description: &'static str,
    pub aliases: &'static [&'static str],
    /// Translations that must all be offered by the widget
    pub options: &'static [OptionPair],
    /// Translations applied when offered (country lists)
    pub soft_options: &'static [OptionPair],
    pub depends_on: Option<Condition>,
    pub optional: bool,
    /// Single text input that takes `DD.MM.YYYY`
    pub date: bool,
    pub children: Vec<MapEntry>,
}

impl MapEntry {
    pub fn field(key: &'static str, label: &'static str, description: &'static str) -> Self {
        MapEntry {
            key,
            label,
            description,
            aliases: &[],
            options: &[],
            soft_options: &[],
            depends_on: None,
            optional: false,
            date: false,
            children: Vec::new(),
        }
    }

    pub fn group(
        key: &'static str,
        legend: &'static str,
        description: &'static str,
        children: Vec<MapEntry>,
    ) -> Self {
        MapEntry {
            children,
            ..MapEntry::field(key, legend, description)
        }
    }

    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn options(mut self, options: &'static [OptionPair]) -> Self {
        self.options = options;
        self
    }

    pub fn countries(mut self) -> Self {
        self.soft_options = COUNTRIES;
        self
    }

    pub fn depends_on(mut self, condition: Condition) -> Self {
        self.depends_on = Some(condition);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn date(mut self) -> Self {
        self.date = true;
        self
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MapPage {
    pub name: &'static str,
    /// German tab caption
    pub title: &'static str,
    pub entries: Vec<MapEntry>,
}

#[derive(Debug, Clone)]
pub struct FormMap {
    pub version: String,
    pub form_url: String,
    pub pages: Vec<MapPage>,
    /// Buttons clicked after the last page to obtain the PDF
    pub print_labels: Vec<String>,
}

impl FormMap {
    /// Full keys declared more than once (top-level keys, aliases, and
    /// namespaced children).
    pub fn duplicate_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for page in &self.pages {
            for entry in &page.entries {
                let names = std::iter::once(entry.key).chain(entry.aliases.iter().copied());
                for name in names {
                    if !seen.insert(name.to_string()) {
                        duplicates.push(name.to_string());
                    }
                }
                for child in &entry.children {
                    let full = format!("{}.{}", entry.key, child.key);
                    if !seen.insert(full.clone()) {
                        duplicates.push(full);
                    }
                }
            }
        }
        duplicates
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.form_url = url.to_string();
        self
    }

    /// The VIDEX short-stay application.
    pub fn videx() -> Self {
        FormMap {
            version: FORM_MAP_VERSION.to_string(),
            form_url: VIDEX_FORM_URL.to_string(),
            pages: vec![
                personal_page(),
                contact_page(),
                documents_page(),
                travel_page(),
                reference_page(),
                costs_page(),
            ],
            print_labels: vec!["Weiter".to_string(), "PDF herunterladen".to_string()],
        }
    }
}

// ============================================================================
// Pages
// ============================================================================

fn personal_page() -> MapPage {
    MapPage {
        name: "personal",
        title: "Angaben zur Person",
        entries: vec![
            MapEntry::field("surname", "Familienname", "Family name(s) as in the passport")
                .aliases(&["family_name"]),
            MapEntry::field("birth_name", "Geburtsname", "Surname at birth, if different")
                .aliases(&["maiden_name"])
                .optional(),
            MapEntry::field("first_name", "Vorname(n)", "First name(s) as in the passport")
                .aliases(&["given_names"]),
            MapEntry::group(
                "date_of_birth",
                "Geburtsdatum",
                "Date of birth, DD.MM.YYYY",
                vec![
                    MapEntry::field("day", "Tag", "Day of birth"),
                    MapEntry::field("month", "Monat", "Month of birth"),
                    MapEntry::field("year", "Jahr", "Year of birth"),
                ],
            )
            .aliases(&["birth_date"]),
            MapEntry::field("place_of_birth", "Geburtsort", "Town or city of birth")
                .aliases(&["birth_place"]),
            MapEntry::field("country_of_birth", "Geburtsland", "Country of birth")
                .aliases(&["birth_country"])
                .countries(),
            MapEntry::field("gender", "Geschlecht", "Sex")
                .aliases(&["sex"])
                .options(GENDERS),
            MapEntry::field("marital_status", "Familienstand", "Civil status")
                .options(MARITAL_STATUSES),
            MapEntry::field("nationality", "Derzeitige Staatsangehörigkeit", "Current nationality")
                .aliases(&["current_nationality"])
                .countries(),
            MapEntry::field(
                "nationality_at_birth",
                "Staatsangehörigkeit bei Geburt, falls abweichend",
                "Nationality at birth, if different",
            )
            .aliases(&["birth_nationality"])
            .optional()
            .countries(),
            MapEntry::field(
                "eu_family_member",
                "Familienangehöriger eines Unionsbürgers",
                "Family member of an EU/EEA/CH citizen exercising the right of free movement",
            )
            .aliases(&["right_of_free_movement"])
            .optional(),
        ],
    }
}

fn contact_page() -> MapPage {
    MapPage {
        name: "contact",
        title: "Kontaktdaten",
        entries: vec![
            MapEntry::group(
                "home_address",
                "Wohnanschrift",
                "Home address of the applicant",
                address_children(true),
            ),
            MapEntry::field("phone", "Telefon/Mobilnummer", "Telephone or mobile number")
                .aliases(&["telephone", "mobile"]),
            MapEntry::field("email", "E-Mail", "E-mail address"),
            MapEntry::field(
                "residence_permit",
                "Wohnsitz in einem anderen Land als dem der derzeitigen Staatsangehörigkeit",
                "Resident in a country other than that of current nationality",
            )
            .aliases(&["has_residence_permit"])
            .optional(),
            MapEntry::field("occupation", "Derzeitige berufliche Tätigkeit", "Current occupation")
                .aliases(&["profession"]),
            MapEntry::field(
                "employer",
                "Arbeitgeber/Bildungseinrichtung",
                "Employer name and telephone (students: educational establishment)",
            )
            .aliases(&["company_name"])
            .optional(),
            MapEntry::group(
                "employer_address",
                "Anschrift des Arbeitgebers",
                "Address of the employer or educational establishment",
                address_children(true),
            )
            .optional(),
        ],
    }
}

fn documents_page() -> MapPage {
    MapPage {
        name: "documents",
        title: "Unterlagen",
        entries: vec![
            MapEntry::field("passport_type", "Art des Reisedokuments", "Type of travel document")
                .options(PASSPORT_TYPES),
            MapEntry::field("passport_number", "Nummer des Reisedokuments", "Travel document number"),
            MapEntry::field(
                "national_id",
                "Nationale Identitätsnummer",
                "National identity number, where applicable",
            )
            .aliases(&["national_id_number"])
            .optional(),
            MapEntry::field("passport_issue_date", "Ausstellungsdatum", "Date of issue, DD.MM.YYYY")
                .date()
                .aliases(&["passport_valid_from"]),
            MapEntry::field("passport_expiry_date", "Gültig bis", "Valid until, DD.MM.YYYY")
                .date()
                .aliases(&["passport_valid_until"]),
            MapEntry::field("passport_issuing_country", "Ausstellender Staat", "Issuing state")
                .countries(),
            MapEntry::field("passport_issued_by", "Ausgestellt von", "Issuing authority")
                .aliases(&["passport_issuing_authority"]),
            MapEntry::field(
                "fingerprints_collected",
                "Fingerabdrücke wurden bereits früher erfasst",
                "Fingerprints collected previously for a Schengen visa",
            )
            .aliases(&["has_fingerprints"])
            .optional(),
        ],
    }
}

fn travel_page() -> MapPage {
    MapPage {
        name: "travel",
        title: "Reisedaten",
        entries: vec![
            MapEntry::field("purpose_of_visit", "Hauptzweck(e) der Reise", "Main purpose of the journey")
                .aliases(&["travel_purpose"])
                .options(PURPOSES),
            MapEntry::field("purpose_description", "Sonstiger Reisezweck", "Purpose, when 'Other'")
                .depends_on(Condition::equals("purpose_of_visit", "Other")),
            MapEntry::field(
                "additional_info",
                "Weitere Informationen zum Reisezweck",
                "Further information on the purpose of stay",
            )
            .optional(),
            MapEntry::field(
                "first_entry_country",
                "Mitgliedstaat der ersten Einreise",
                "Member State of first entry",
            )
            .aliases(&["entry_country"])
            .countries(),
            MapEntry::field("main_destination", "Hauptreiseziel", "Main destination Member State")
                .aliases(&["destination_country"])
                .countries(),
            MapEntry::field(
                "number_of_entries",
                "Anzahl der beantragten Einreisen",
                "Number of entries requested",
            )
            .aliases(&["entries"])
            .options(ENTRIES),
            MapEntry::field(
                "visa_start_date",
                "Geplantes Ankunftsdatum",
                "Intended date of arrival, DD.MM.YYYY",
            )
            .date()
            .aliases(&["travel_start_date"]),
            MapEntry::field(
                "visa_end_date",
                "Geplantes Abreisedatum",
                "Intended date of departure, DD.MM.YYYY",
            )
            .date()
            .aliases(&["travel_end_date"]),
            MapEntry::field(
                "previous_visa_number",
                "Nummer der letzten Visummarke",
                "Visa sticker number of the last visa, if known",
            )
            .optional(),
        ],
    }
}

fn reference_page() -> MapPage {
    let inviting = || Condition::All {
        conditions: vec![
            Condition::one_of("purpose_of_visit", INVITER_PURPOSES),
            Condition::equals("reference_type", "Inviting person"),
        ],
    };
    let hotel = || Condition::equals("reference_type", "Hotel");

    MapPage {
        name: "reference",
        title: "Referenz",
        entries: vec![
            MapEntry::field("reference_type", "Art der Referenz", "Who vouches for the stay")
                .aliases(&["inviter_type"])
                .options(REFERENCE_TYPES),
            MapEntry::field("inviter_surname", "Familienname", "Inviting person: family name")
                .depends_on(inviting()),
            MapEntry::field("inviter_first_name", "Vorname(n)", "Inviting person: first name(s)")
                .depends_on(inviting()),
            MapEntry::field(
                "inviter_date_of_birth",
                "Geburtsdatum",
                "Inviting person: date of birth, DD.MM.YYYY",
            )
            .date()
            .depends_on(inviting())
            .optional(),
            MapEntry::group(
                "inviter_address",
                "Anschrift der einladenden Person",
                "Inviting person: address in the Schengen area",
                address_children(false),
            )
            .depends_on(inviting()),
            MapEntry::field("inviter_phone", "Telefon", "Inviting person: telephone")
                .depends_on(inviting())
                .optional(),
            MapEntry::field("inviter_email", "E-Mail", "Inviting person: e-mail")
                .depends_on(inviting())
                .optional(),
            MapEntry::field("hotel_name", "Name des Hotels", "Hotel or temporary accommodation")
                .depends_on(hotel()),
            MapEntry::group(
                "hotel_address",
                "Anschrift des Hotels",
                "Address of the hotel",
                address_children(false),
            )
            .depends_on(hotel()),
        ],
    }
}

fn costs_page() -> MapPage {
    MapPage {
        name: "costs",
        title: "Kostenübernahme",
        entries: vec![
            MapEntry::field(
                "cost_coverage",
                "Die Reise- und Lebenshaltungskosten trägt",
                "Who covers travel and living costs (one or both)",
            )
            .options(COST_BEARERS),
            MapEntry::field("sponsor_name", "Name des Kostenträgers", "Third party covering the costs")
                .aliases(&["sponsor_company_name"])
                .depends_on(Condition::equals("cost_coverage", "Third party")),
            MapEntry::field(
                "means_of_support",
                "Mittel zur Bestreitung des Lebensunterhalts",
                "Means of support during the stay (one or more)",
            )
            .options(MEANS_OF_SUPPORT),
            MapEntry::field("other_means_specify", "Sonstige Mittel", "Other means of support")
                .depends_on(Condition::equals("means_of_support", "Other")),
        ],
    }
}

fn address_children(with_extra: bool) -> Vec<MapEntry> {
    let mut children = vec![
        MapEntry::field("street", "Straße", "Street"),
        MapEntry::field("house_number", "Hausnummer", "House number"),
    ];
    if with_extra {
        children.push(
            MapEntry::field("additional", "Sonstige Adressangaben", "Other address information")
                .aliases(&["address_extra"])
                .optional(),
        );
    }
    children.extend([
        MapEntry::field("postal_code", "Postleitzahl", "Postal code").aliases(&["zip_code"]),
        MapEntry::field("city", "Ort", "Town/city"),
        MapEntry::field("country", "Land", "Country").countries(),
    ]);
    children
}

// ============================================================================
// Option translations
// ============================================================================

const GENDERS: &[OptionPair] = &[("Male", "männlich"), ("Female", "weiblich"), ("Diverse", "divers")];

const MARITAL_STATUSES: &[OptionPair] = &[
    ("Single", "ledig"),
    ("Married", "verheiratet"),
    ("Registered partnership", "eingetragene Partnerschaft"),
    ("Separated", "getrennt lebend"),
    ("Divorced", "geschieden"),
    ("Widow(er)", "verwitwet"),
    ("Other", "sonstiges"),
];

const PASSPORT_TYPES: &[OptionPair] = &[
    ("Ordinary passport", "Normaler Pass"),
    ("Diplomatic passport", "Diplomatenpass"),
    ("Service passport", "Dienstpass"),
    ("Official passport", "Amtlicher Pass"),
    ("Special passport", "Sonderpass"),
    ("Other travel document", "Sonstiges Reisedokument"),
];

const PURPOSES: &[OptionPair] = &[
    ("Tourism", "Tourismus"),
    ("Business", "Geschäftsreise"),
    ("Visiting family/friends", "Besuch von Familienangehörigen oder Freunden"),
    ("Cultural", "Kultur"),
    ("Sports", "Sport"),
    ("Official visit", "Offizieller Besuch"),
    ("Medical reasons", "Gesundheitliche Gründe"),
    ("Study", "Studium"),
    ("Airport transit", "Flughafentransit"),
    ("Other", "Sonstiges"),
];

/// Purposes for which an inviting person is asked for. Tourism and airport
/// transit never carry one.
const INVITER_PURPOSES: &[&str] = &[
    "Visiting family/friends",
    "Business",
    "Cultural",
    "Sports",
    "Official visit",
    "Medical reasons",
    "Study",
    "Other",
];

const ENTRIES: &[OptionPair] = &[
    ("Single entry", "Einmalige Einreise"),
    ("Two entries", "Zweimalige Einreise"),
    ("Multiple entries", "Mehrfache Einreise"),
];

const REFERENCE_TYPES: &[OptionPair] = &[
    ("Inviting person", "Einladende Person"),
    ("Hotel", "Hotel/vorübergehende Unterkunft"),
    ("Company or organisation", "Einladendes Unternehmen/Organisation"),
];

const COST_BEARERS: &[OptionPair] = &[
    ("Applicant", "der Antragsteller selbst"),
    ("Third party", "ein Dritter (Gastgeber, Unternehmen, Organisation)"),
];

const MEANS_OF_SUPPORT: &[OptionPair] = &[
    ("Cash", "Bargeld"),
    ("Traveller's cheques", "Reiseschecks"),
    ("Credit cards", "Kreditkarten"),
    ("Accommodation paid in advance", "Im Voraus bezahlte Unterkunft"),
    ("All expenses covered", "Übernahme aller Kosten während des Aufenthalts"),
    ("Transport paid in advance", "Im Voraus bezahlte Beförderung"),
    ("Other", "Sonstiges"),
];

const COUNTRIES: &[OptionPair] = &[
    ("Austria", "Österreich"),
    ("Belgium", "Belgien"),
    ("Brazil", "Brasilien"),
    ("Bulgaria", "Bulgarien"),
    ("Canada", "Kanada"),
    ("China", "China"),
    ("Croatia", "Kroatien"),
    ("Czech Republic", "Tschechien"),
    ("Denmark", "Dänemark"),
    ("Egypt", "Ägypten"),
    ("Estonia", "Estland"),
    ("Finland", "Finnland"),
    ("France", "Frankreich"),
    ("Germany", "Deutschland"),
    ("Greece", "Griechenland"),
    ("Hungary", "Ungarn"),
    ("Iceland", "Island"),
    ("India", "Indien"),
    ("Indonesia", "Indonesien"),
    ("Iran", "Iran"),
    ("Italy", "Italien"),
    ("Latvia", "Lettland"),
    ("Lithuania", "Litauen"),
    ("Luxembourg", "Luxemburg"),
    ("Malta", "Malta"),
    ("Morocco", "Marokko"),
    ("Netherlands", "Niederlande"),
    ("Nigeria", "Nigeria"),
    ("Norway", "Norwegen"),
    ("Pakistan", "Pakistan"),
    ("Philippines", "Philippinen"),
    ("Poland", "Polen"),
    ("Portugal", "Portugal"),
    ("Romania", "Rumänien"),
    ("Russia", "Russische Föderation"),
    ("Saudi Arabia", "Saudi-Arabien"),
    ("Slovakia", "Slowakei"),
    ("Slovenia", "Slowenien"),
    ("South Africa", "Südafrika"),
    ("Spain", "Spanien"),
    ("Sri Lanka", "Sri Lanka"),
    ("Sweden", "Schweden"),
    ("Switzerland", "Schweiz"),
    ("Thailand", "Thailand"),
    ("Turkey", "Türkei"),
    ("Ukraine", "Ukraine"),
    ("United Arab Emirates", "Vereinigte Arabische Emirate"),
    ("United Kingdom", "Vereinigtes Königreich"),
    ("United States", "Vereinigte Staaten"),
    ("Vietnam", "Vietnam"),
];
