//! The complete record-type roster: core business entities plus the
//! legacy CSV-mirror ledger tables carried over from the old system.
//!
//! Every descriptor is registered under its canonical normalized name.
//! Legacy mirrors keep their imported cell text as-is (dates stay text
//! columns; the form layer still rewrites `dd/mm/yyyy` input for any
//! field whose name marks it as a date).

use crate::core::field::{boolean, date, number, status_field, text, FieldDef};
use crate::registry::EntityDescriptor;

const CATEGORY_CHOICES: &[&str] = &["loan", "deposit"];
const KYC_DOC_CHOICES: &[&str] = &["aadhar", "pan", "voter", "ration", "photo", "other"];
const KYC_STATUS_CHOICES: &[&str] = &["pending", "verified", "rejected"];
const HEAD_TYPE_CHOICES: &[&str] = &["asset", "liability", "income", "expense"];

fn legacy(name: &'static str, pretty: &'static str, fields: Vec<FieldDef>) -> EntityDescriptor {
    EntityDescriptor::new(name, pretty)
        .with_fields(fields)
        .raw_csv()
}

pub fn all_descriptors() -> Vec<EntityDescriptor> {
    let mut all = core_descriptors();
    all.extend(legacy_descriptors());
    all
}

// ============================================================
// Core business entities
// ============================================================

fn core_descriptors() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new("company", "Company")
            .with_code("code", "CMP")
            .with_fields(vec![
                text("code").code(),
                text("name").required(),
                text("address"),
                text("phone").phone(),
                text("email"),
                status_field(),
            ]),
        EntityDescriptor::new("branch", "Branch")
            .with_code("code", "BRN")
            .with_fields(vec![
                text("code").code(),
                text("name").required(),
                number("company").references("company"),
                text("address"),
                text("contact").phone(),
                status_field(),
            ]),
        EntityDescriptor::new("village", "Village")
            .with_code("vcode", "VIL")
            .with_fields(vec![
                text("vcode").code(),
                text("vname").required(),
                date("tdate"),
                number("branch").references("branch"),
                status_field(),
            ]),
        EntityDescriptor::new("center", "Center")
            .with_code("code", "CTR")
            .with_fields(vec![
                text("code").code(),
                text("name").required(),
                number("village").references("village"),
                text("meeting_day"),
                status_field(),
            ]),
        EntityDescriptor::new("group", "Group")
            .with_code("code", "GRP")
            .with_fields(vec![
                text("code").code(),
                text("name").required(),
                number("center").references("center"),
                status_field(),
            ]),
        EntityDescriptor::new("role", "Role").with_fields(vec![
            text("name").required().unique(),
            text("permissions"),
            status_field(),
        ]),
        EntityDescriptor::new("cadre", "Cadre").with_fields(vec![
            text("name").required(),
            number("level"),
            status_field(),
        ]),
        EntityDescriptor::new("staff", "Staff")
            .with_code("staffcode", "STF")
            .with_fields(vec![
                text("staffcode").code(),
                text("name").required(),
                number("branch").references("branch"),
                number("cadre").references("cadre"),
                text("designation"),
                text("contact1").phone().unique(),
                text("contact2").phone(),
                text("adharno").aadhaar().unique(),
                text("housecontactno").phone(),
                date("joining_date"),
                status_field(),
            ]),
        EntityDescriptor::new("userprofile", "User Profile").with_fields(vec![
            text("user"),
            number("staff").references("staff"),
            text("full_name"),
            number("branch").references("branch"),
            text("department"),
            text("mobile").phone(),
            boolean("is_admin"),
            boolean("is_master"),
            boolean("is_data_entry"),
            boolean("is_reports"),
            boolean("is_accounting"),
            boolean("is_recovery_agent"),
            boolean("is_auditor"),
            boolean("is_manager"),
            text("password").password(),
            status_field(),
        ]),
        // Managed through the dedicated permissions UI; generic CRUD is
        // blocked for its tokens at the registry.
        EntityDescriptor::new("userpermission", "User Permission")
            .no_extra_data()
            .with_fields(vec![
                number("user_profile").references("userprofile"),
                boolean("is_admin"),
                boolean("is_master"),
                boolean("is_data_entry"),
                boolean("is_reports"),
                boolean("is_accounting"),
                boolean("is_recovery_agent"),
                boolean("is_auditor"),
                boolean("is_manager"),
            ]),
        EntityDescriptor::new("product", "Product")
            .with_code("code", "PRD")
            .with_fields(vec![
                text("code").code(),
                text("name").required(),
                text("category").choices(CATEGORY_CHOICES).default_value("loan"),
                number("interest_rate"),
                number("term_months"),
                status_field(),
            ]),
        EntityDescriptor::new("client", "Client")
            .with_code("smtcode", "CL")
            .with_fields(vec![
                text("smtcode").code(),
                text("name").required(),
                number("group").references("group"),
                number("village").references("village"),
                text("aadhar").aadhaar().unique(),
                text("contactno").phone().unique(),
                date("dob"),
                text("gender"),
                text("address"),
                status_field(),
            ]),
        EntityDescriptor::new("clientjoiningform", "Client Joining Form").with_fields(vec![
            number("client").references("client"),
            date("joining_date"),
            number("fee"),
            status_field(),
        ]),
        EntityDescriptor::new("loanapplication", "Loan Application")
            .with_code("application_number", "LAP")
            .with_fields(vec![
                text("application_number").code(),
                number("client").references("client"),
                number("product").references("product"),
                number("amount_requested").required(),
                number("amount_sanctioned"),
                date("applied_date"),
                status_field(),
            ]),
        EntityDescriptor::new("loanapproval", "Loan Approval").with_fields(vec![
            number("loan_application").references("loanapplication"),
            number("approved_amount"),
            date("approval_date"),
            number("approved_by").references("staff"),
            status_field(),
        ]),
        EntityDescriptor::new("disbursement", "Disbursement").with_fields(vec![
            number("loan_application").references("loanapplication"),
            number("amount"),
            date("disbursement_date"),
            text("mode"),
            status_field(),
        ]),
        EntityDescriptor::new("appointment", "Appointment")
            .with_code("code", "APT")
            .with_fields(vec![
                text("code").code(),
                text("title").required(),
                number("staff").references("staff"),
                date("appointment_date"),
                text("location"),
                text("notes"),
                status_field(),
            ]),
        EntityDescriptor::new("salarystatement", "Salary Statement").with_fields(vec![
            number("staff").references("staff"),
            text("month"),
            number("year"),
            number("basic_pay"),
            number("allowances"),
            number("deductions"),
            number("net_pay"),
            status_field(),
        ]),
        EntityDescriptor::new("businesssetting", "Business Setting").with_fields(vec![
            text("key").required().unique(),
            text("value"),
            number("company").references("company"),
            status_field(),
        ]),
        EntityDescriptor::new("fieldschedule", "Field Schedule").with_fields(vec![
            number("staff").references("staff"),
            number("village").references("village"),
            date("schedule_date"),
            text("notes"),
            status_field(),
        ]),
        EntityDescriptor::new("fieldreport", "Field Report")
            .with_code("code", "FR")
            .with_fields(vec![
                text("code").code(),
                number("staff").references("staff"),
                date("report_date"),
                text("summary"),
                status_field(),
            ]),
        EntityDescriptor::new("reportdropdownmenu", "Report Dropdown Menu").with_fields(vec![
            text("menu_name").required(),
            text("options"),
            number("order"),
            status_field(),
        ]),
        EntityDescriptor::new("weeklyreport", "Weekly Report").with_fields(vec![
            date("week_start"),
            number("branch").references("branch"),
            number("collections"),
            number("disbursements"),
            status_field(),
        ]),
        EntityDescriptor::new("monthlyreport", "Monthly Report").with_fields(vec![
            text("month"),
            number("year"),
            number("branch").references("branch"),
            number("collections"),
            number("disbursements"),
            status_field(),
        ]),
        // Backing table of the dynamic column store. No status and no
        // extra bag: deleting a definition really removes it.
        EntityDescriptor::new("column", "Column")
            .no_extra_data()
            .with_fields(vec![
                text("module").required(),
                text("field_name").required(),
                text("label"),
                text("field_type").default_value("text"),
                boolean("required"),
                number("order"),
            ]),
        EntityDescriptor::new("accounthead", "Account Head")
            .with_code("code", "AH")
            .with_fields(vec![
                text("code").code(),
                text("name").required(),
                number("parent").references_restrict("accounthead"),
                text("head_type").choices(HEAD_TYPE_CHOICES),
                status_field(),
            ]),
        EntityDescriptor::new("voucher", "Voucher")
            .with_code("voucher_no", "VCH")
            .with_fields(vec![
                text("voucher_no").code(),
                date("voucher_date"),
                number("account_head").references_restrict("accounthead"),
                text("narration"),
                number("amount"),
                status_field(),
            ]),
        EntityDescriptor::new("posting", "Posting").with_fields(vec![
            number("voucher").references_restrict("voucher"),
            number("account_head").references_restrict("accounthead"),
            number("debit"),
            number("credit"),
            text("ttype"),
        ]),
        EntityDescriptor::new("recoveryposting", "Recovery Posting").with_fields(vec![
            number("client").references_restrict("client"),
            number("voucher").references_restrict("voucher"),
            number("amount"),
            date("posting_date"),
        ]),
        EntityDescriptor::new("kycdocument", "KYC Document").with_fields(vec![
            number("client").references("client"),
            text("doc_type").choices(KYC_DOC_CHOICES),
            text("doc_number"),
            text("status")
                .choices(KYC_STATUS_CHOICES)
                .default_value("pending")
                .hidden(),
        ]),
        EntityDescriptor::new("alertrule", "Alert Rule").with_fields(vec![
            text("name").required(),
            text("rule_type"),
            number("threshold"),
            status_field(),
        ]),
        EntityDescriptor::new("alertevent", "Alert Event").with_fields(vec![
            number("rule").references("alertrule"),
            text("message"),
            text("level"),
            status_field(),
        ]),
    ]
}

// ============================================================
// Legacy CSV-mirror tables
// ============================================================

fn legacy_descriptors() -> Vec<EntityDescriptor> {
    vec![
        legacy("members", "Members", vec![
            text("smtcode"),
            text("name"),
            text("groupcode"),
            text("villagename"),
            number("savings"),
            number("loanbal"),
        ]),
        legacy("acccashbook", "Acc Cashbook", vec![
            number("voucherno"),
            text("tdate"),
            text("acode"),
            number("debit"),
            number("credit"),
            number("pid"),
        ]),
        legacy("acccashbookold", "Acc Cashbook Old", vec![
            number("voucherno"),
            text("tdate"),
            text("acode"),
            number("debit"),
            number("credit"),
        ]),
        legacy("accheads", "Acc Heads", vec![
            text("acode"),
            text("name"),
            text("headtype"),
            number("openingbal"),
        ]),
        legacy("aadhar", "Aadhar", vec![
            text("smtcode"),
            text("aadharno"),
            text("name"),
        ]),
        legacy("accfundloancols", "Acc Fund Loan Collections", vec![
            text("smtcode"),
            text("tdate"),
            number("amount"),
            number("intamount"),
        ]),
        legacy("accfundloans", "Acc Fund Loans", vec![
            text("loanno"),
            text("smtcode"),
            text("sancdate"),
            number("sancamount"),
            number("balance"),
        ]),
        legacy("accountmaster", "Account Master", vec![
            text("acode"),
            text("name"),
            text("category"),
            number("openingbal"),
        ]),
        legacy("arrear", "Arrear", vec![
            text("smtcode"),
            text("name"),
            number("overdue"),
            number("weeks"),
        ]),
        legacy("cheque", "Cheque", vec![
            text("chequeno"),
            text("bank"),
            text("chequedate"),
            number("amount"),
        ]),
        legacy("codes", "Codes", vec![
            text("codetype"),
            text("code"),
            text("description"),
        ]),
        legacy("contacts", "Contacts", vec![
            text("name"),
            text("mobile"),
            text("address"),
        ]),
        legacy("dayend", "Day End", vec![
            text("tdate"),
            number("receipts"),
            number("payments"),
            number("closingbal"),
        ]),
        legacy("equity2", "Equity 2", vec![
            text("smtcode"),
            text("name"),
            number("shares"),
            number("amount"),
        ]),
        legacy("equityshare31032014", "Equity Share 31-03-2014", vec![
            text("smtcode"),
            number("shares"),
            number("amount"),
        ]),
        legacy("equityshare31032015", "Equity Share 31-03-2015", vec![
            text("smtcode"),
            number("shares"),
            number("amount"),
        ]),
        legacy("gr", "GR", vec![
            text("grno"),
            text("tdate"),
            text("particulars"),
            number("amount"),
        ]),
        legacy("groups", "Groups (CSV)", vec![
            text("groupcode"),
            text("groupname"),
            text("centercode"),
            text("formationdate"),
        ]),
        legacy("mxagent", "MX Agent", vec![
            text("agentcode"),
            text("name"),
            text("mobile"),
        ]),
        legacy("mxcode", "MX Code", vec![
            text("codetype"),
            text("code"),
            text("label"),
        ]),
        legacy("mxmember", "MX Member", vec![
            text("memberno"),
            text("name"),
            text("groupcode"),
            text("joindate"),
        ]),
        legacy("mxsavings", "MX Savings", vec![
            text("memberno"),
            text("tdate"),
            number("deposit"),
            number("withdrawal"),
            number("balance"),
        ]),
        legacy("massposting", "Mass Posting", vec![
            text("tdate"),
            text("acode"),
            number("amount"),
            text("narration"),
        ]),
        legacy("masterbranch", "Master Branch", vec![
            text("branchcode"),
            text("branchname"),
            text("address"),
        ]),
        legacy("mastercategories", "Master Categories", vec![
            text("categorycode"),
            text("categoryname"),
        ]),
        legacy("masterfs", "Master FS", vec![text("fscode"), text("fsname")]),
        legacy("masterloanpurposes", "Master Loan Purposes", vec![
            text("purposecode"),
            text("purpose"),
        ]),
        legacy("masterloantypes", "Master Loan Types", vec![
            text("loantypecode"),
            text("loantype"),
            number("interestrate"),
        ]),
        legacy("mastermonth", "Master Month", vec![
            number("monthno"),
            text("monthname"),
        ]),
        legacy("mastersectors", "Master Sectors", vec![
            text("sectorcode"),
            text("sectorname"),
        ]),
        legacy("mastersetup", "Master Setup", vec![
            text("setupkey"),
            text("setupvalue"),
        ]),
        legacy("masterweeks", "Master Weeks", vec![
            number("weekno"),
            text("weeklabel"),
        ]),
        legacy("mxagriment", "MX Agreement", vec![
            text("agrimentno"),
            text("memberno"),
            text("agrimentdate"),
            number("amount"),
        ]),
        legacy("mxloancols", "MX Loan Collections", vec![
            text("loanno"),
            text("tdate"),
            number("principal"),
            number("interest"),
        ]),
        legacy("mxloans", "MX Loans", vec![
            text("loanno"),
            text("memberno"),
            text("sancdate"),
            number("sancamount"),
            number("balance"),
        ]),
        legacy("mxsalaries", "MX Salaries", vec![
            text("empcode"),
            text("month"),
            number("basic"),
            number("allowances"),
            number("netpay"),
        ]),
        legacy("pdc", "PDC", vec![
            text("chequeno"),
            text("smtcode"),
            text("duedate"),
            number("amount"),
        ]),
        legacy("rptdaybook", "Rpt Daybook", vec![
            text("tdate"),
            text("acode"),
            text("particulars"),
            number("debit"),
            number("credit"),
        ]),
        legacy("securitydeposit", "Security Deposit", vec![
            text("smtcode"),
            text("tdate"),
            number("amount"),
        ]),
        legacy("staffloans", "Staff Loans", vec![
            text("empcode"),
            text("sancdate"),
            number("sancamount"),
            number("balance"),
        ]),
        legacy("transefer", "Transefer", vec![
            text("fromacode"),
            text("toacode"),
            text("tdate"),
            number("amount"),
        ]),
        legacy("cobarower", "Co-Borrower", vec![
            text("loanno"),
            text("smtcode"),
            text("name"),
            text("relation"),
        ]),
        legacy("collectionrpt", "Collection Rpt", vec![
            text("tdate"),
            text("groupcode"),
            number("demand"),
            number("collected"),
        ]),
        legacy("fund", "Fund", vec![
            text("fundcode"),
            text("fundname"),
            number("amount"),
        ]),
        legacy("loancols", "Loan Collections", vec![
            text("loanno"),
            text("tdate"),
            number("principal"),
            number("interest"),
            number("balance"),
        ]),
        legacy("loans", "Loans", vec![
            text("loanno"),
            text("smtcode"),
            text("sancdate"),
            number("sancamount"),
            number("balance"),
        ]),
        legacy("mloanschedule", "M Loan Schedule", vec![
            text("loanno"),
            number("installmentno"),
            text("duedate"),
            number("principal"),
            number("interest"),
        ]),
        legacy("mloancols", "M Loan Collections", vec![
            text("loanno"),
            text("tdate"),
            number("amount"),
        ]),
        legacy("mloans", "M Loans", vec![
            text("loanno"),
            text("memberno"),
            number("sancamount"),
            number("balance"),
        ]),
        legacy("mlogin", "M Login", vec![text("username"), text("lastlogin")]),
        legacy("mmisc", "M Misc", vec![text("key"), text("value")]),
        legacy("mrecvisit", "M Recovery Visit", vec![
            text("memberno"),
            text("visitdate"),
            text("remarks"),
        ]),
        legacy("msetup", "M Setup", vec![text("setupkey"), text("setupvalue")]),
        legacy("msurity", "M Surety", vec![
            text("loanno"),
            text("suritycode"),
            text("suritytype"),
        ]),
        legacy("memberdeposits", "Member Deposits", vec![
            text("memberno"),
            text("tdate"),
            number("deposit"),
            number("balance"),
        ]),
        legacy("pbdet", "Passbook Details", vec![
            text("passbookno"),
            text("smtcode"),
            text("issuedate"),
        ]),
        legacy("rptincome", "Rpt Income", vec![
            text("tdate"),
            text("head"),
            number("amount"),
        ]),
        legacy("rptoutstanding", "Rpt Outstanding", vec![
            text("loanno"),
            text("smtcode"),
            number("principal"),
            number("overdue"),
        ]),
        legacy("rptpassbook", "Rpt Passbook", vec![
            text("passbookno"),
            text("tdate"),
            text("particulars"),
            number("amount"),
        ]),
        legacy("rpttb", "Rpt Trial Balance", vec![
            text("acode"),
            text("name"),
            number("debit"),
            number("credit"),
        ]),
        legacy("savings", "Savings", vec![
            text("smtcode"),
            text("tdate"),
            number("deposit"),
            number("withdrawal"),
            number("balance"),
        ]),
        legacy("setup", "Setup", vec![
            text("setupkey"),
            text("setupvalue"),
            text("updatedon"),
        ]),
        legacy("share", "Share", vec![
            text("smtcode"),
            number("shares"),
            number("amount"),
        ]),
        legacy("smtavail", "SMT Avail", vec![
            text("smtcode"),
            text("name"),
            text("availdate"),
        ]),
        legacy("temp", "Temp", vec![text("col1"), text("col2"), text("col3")]),
        legacy("users", "Users (CSV)", vec![
            text("username"),
            text("fullname"),
            text("role"),
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{normalize_entity, PermissionGroup, SoftDeleteMode};

    #[test]
    fn test_roster_names_are_canonical_and_unique() {
        let all = all_descriptors();
        let mut seen = std::collections::HashSet::new();
        for desc in &all {
            assert_eq!(desc.name, normalize_entity(desc.name), "{}", desc.name);
            assert!(seen.insert(desc.name), "duplicate {}", desc.name);
        }
        // core + legacy mirrors, the scale the engine is built for
        assert!(all.len() >= 85, "roster has {} entries", all.len());
    }

    #[test]
    fn test_reference_targets_exist() {
        let all = all_descriptors();
        let names: std::collections::HashSet<_> = all.iter().map(|d| d.name).collect();
        for desc in &all {
            for field in &desc.fields {
                if let Some(reference) = field.reference {
                    assert!(
                        names.contains(reference.entity),
                        "{}.{} references unknown entity {}",
                        desc.name,
                        field.name,
                        reference.entity
                    );
                }
            }
        }
    }

    #[test]
    fn test_soft_delete_modes() {
        let all = all_descriptors();
        let mode = |name: &str| {
            all.iter()
                .find(|d| d.name == name)
                .map(|d| d.soft_delete_mode())
                .unwrap()
        };
        assert_eq!(mode("staff"), SoftDeleteMode::Status);
        assert_eq!(mode("posting"), SoftDeleteMode::ExtraFlag);
        assert_eq!(mode("acccashbook"), SoftDeleteMode::ExtraFlag);
        assert_eq!(mode("column"), SoftDeleteMode::Hard);
        assert_eq!(mode("userpermission"), SoftDeleteMode::Hard);
    }

    #[test]
    fn test_permission_groups_assigned() {
        let all = all_descriptors();
        let group = |name: &str| all.iter().find(|d| d.name == name).map(|d| d.group).unwrap();
        assert_eq!(group("client"), PermissionGroup::Operational);
        assert_eq!(group("posting"), PermissionGroup::Accounting);
        assert_eq!(group("monthlyreport"), PermissionGroup::Reporting);
        assert_eq!(group("staff"), PermissionGroup::General);
    }

    #[test]
    fn test_code_specs() {
        let all = all_descriptors();
        let staff = all.iter().find(|d| d.name == "staff").unwrap();
        let spec = staff.code.unwrap();
        assert_eq!(spec.field, "staffcode");
        assert_eq!(spec.prefix, "STF");
        assert_eq!(spec.width, 3);
        assert!(staff.code_field_index().is_some());

        let voucher = all.iter().find(|d| d.name == "voucher").unwrap();
        assert_eq!(voucher.code.unwrap().field, "voucher_no");
    }
}
