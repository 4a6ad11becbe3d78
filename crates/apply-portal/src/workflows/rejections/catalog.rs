/// Free-text box attached to a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailsTemplate {
    /// Form key of the text box: the reason id with a `_details` suffix.
    pub id: String,
    pub label: &'static str,
}

/// One selectable reason, optionally with nested sub-reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonTemplate {
    pub id: &'static str,
    pub label: &'static str,
    pub details: Option<DetailsTemplate>,
    pub sub_reasons: Vec<ReasonTemplate>,
}

impl ReasonTemplate {
    pub fn sub_reason(&self, id: &str) -> Option<&ReasonTemplate> {
        self.sub_reasons.iter().find(|reason| reason.id == id)
    }
}

#[derive(Debug)]
pub struct RejectionReasonCatalog {
    reasons: Vec<ReasonTemplate>,
}

impl RejectionReasonCatalog {
    pub fn standard() -> Self {
        Self {
            reasons: standard_reasons(),
        }
    }

    pub fn new(reasons: Vec<ReasonTemplate>) -> Self {
        Self { reasons }
    }

    pub fn reasons(&self) -> &[ReasonTemplate] {
        &self.reasons
    }

    pub fn reason(&self, id: &str) -> Option<&ReasonTemplate> {
        self.reasons.iter().find(|reason| reason.id == id)
    }
}

fn leaf(id: &'static str, label: &'static str) -> ReasonTemplate {
    ReasonTemplate {
        id,
        label,
        details: None,
        sub_reasons: Vec::new(),
    }
}

fn detailed(id: &'static str, label: &'static str, details_label: &'static str) -> ReasonTemplate {
    ReasonTemplate {
        id,
        label,
        details: Some(DetailsTemplate {
            id: format!("{id}_details"),
            label: details_label,
        }),
        sub_reasons: Vec::new(),
    }
}

fn group(id: &'static str, label: &'static str, sub_reasons: Vec<ReasonTemplate>) -> ReasonTemplate {
    ReasonTemplate {
        id,
        label,
        details: None,
        sub_reasons,
    }
}

fn standard_reasons() -> Vec<ReasonTemplate> {
    vec![
        group(
            "qualifications",
            "Qualifications",
            vec![
                leaf("no_maths_gcse", "No maths GCSE at minimum grade 4 or C, or equivalent"),
                leaf("no_english_gcse", "No English GCSE at minimum grade 4 or C, or equivalent"),
                leaf("no_science_gcse", "No science GCSE at minimum grade 4 or C, or equivalent"),
                leaf("no_degree", "No bachelor's degree or equivalent"),
                detailed(
                    "unverified_qualifications",
                    "Could not verify qualifications",
                    "Details about why you could not verify qualifications",
                ),
                detailed(
                    "unsuitable_degree",
                    "Degree does not meet course requirements",
                    "Details about why the degree does not meet course requirements",
                ),
                detailed("qualifications_other", "Other", "Details about the qualifications"),
            ],
        ),
        group(
            "personal_statement",
            "Personal statement",
            vec![
                detailed(
                    "quality_of_writing",
                    "Quality of writing",
                    "Details about the quality of writing",
                ),
                detailed("personal_statement_other", "Other", "Details about the personal statement"),
            ],
        ),
        group(
            "teaching_knowledge",
            "Teaching knowledge, ability and interview performance",
            vec![
                detailed("subject_knowledge", "Subject knowledge", "Details about subject knowledge"),
                detailed(
                    "safeguarding_knowledge",
                    "Safeguarding knowledge",
                    "Details about safeguarding knowledge",
                ),
                detailed(
                    "teaching_method_knowledge",
                    "Teaching method knowledge",
                    "Details about teaching method knowledge",
                ),
                detailed(
                    "teaching_role_knowledge",
                    "Knowledge of the teaching role",
                    "Details about knowledge of the teaching role",
                ),
                detailed(
                    "teaching_demonstration",
                    "Teaching demonstration",
                    "Details about the teaching demonstration",
                ),
                detailed("teaching_knowledge_other", "Other", "Details about teaching knowledge"),
            ],
        ),
        group(
            "communication_and_scheduling",
            "Communication, interview attendance and scheduling",
            vec![
                detailed(
                    "english_below_standard",
                    "English language ability below expected standard",
                    "Details about English language ability",
                ),
                leaf("did_not_reply", "Did not reply to messages"),
                detailed(
                    "did_not_attend_interview",
                    "Did not attend interview",
                    "Details about interview attendance",
                ),
                detailed(
                    "could_not_arrange_interview",
                    "Could not arrange interview",
                    "Details about arranging an interview",
                ),
                detailed(
                    "communication_and_scheduling_other",
                    "Other",
                    "Details about communication or scheduling",
                ),
            ],
        ),
        detailed("safeguarding", "Safeguarding", "Details about the safeguarding issue"),
        detailed(
            "visa_sponsorship",
            "Cannot sponsor visa",
            "Details about why you cannot sponsor a visa",
        ),
        leaf("course_full", "Course full"),
        detailed("other", "Other", "Details about the reason"),
    ]
}
